// Defines the command-line argument surface using clap.

use clap::Parser;
use esrender_core::config::{
    DEFAULT_ATIS_COLOR, DEFAULT_CRF, DEFAULT_IDLE_COLOR, DEFAULT_OFF_COLOR, DEFAULT_ON_COLOR,
};
use esrender_core::{Codec, CoreError, CoreResult, DecayStyle, Micros, RenderParameters};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Render event-stream (.es) recordings into videos, sound tracks, and still images",
    long_about = "Chains es_to_frames, synth, and ffmpeg to turn event-stream recordings \
                  into finished artifacts. A directory input is rendered recursively, \
                  mirroring its structure under the output directory."
)]
pub struct Cli {
    /// Input .es file, or a directory to render recursively
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file, or output directory for directory input
    /// (derived from the input name and parameters if not provided)
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Ignore events before this timestamp (timecode)
    #[arg(short = 'b', long, default_value = "0", value_parser = Micros::parse, value_name = "TIMECODE")]
    pub begin: Micros,

    /// Ignore events after this timestamp (timecode)
    #[arg(short = 'e', long, value_parser = Micros::parse, value_name = "TIMECODE")]
    pub end: Option<Micros>,

    /// Time between two frames (timecode)
    #[arg(short = 'f', long, default_value = "20000", value_parser = Micros::parse, value_name = "TIMECODE")]
    pub frametime: Micros,

    /// Decay function: exponential, linear, window, cumulative, or cumulative-shared
    #[arg(short = 's', long, default_value = "exponential", value_parser = parse_style, value_name = "STYLE")]
    pub style: DecayStyle,

    /// Decay function parameter (timecode)
    #[arg(short = 't', long, default_value = "200000", value_parser = Micros::parse, value_name = "TIMECODE")]
    pub tau: Micros,

    /// Color for ON events
    #[arg(short = 'j', long, default_value = DEFAULT_ON_COLOR, value_name = "COLOR")]
    pub oncolor: String,

    /// Color for OFF events
    #[arg(short = 'k', long, default_value = DEFAULT_OFF_COLOR, value_name = "COLOR")]
    pub offcolor: String,

    /// Background color
    #[arg(short = 'l', long, default_value = DEFAULT_IDLE_COLOR, value_name = "COLOR")]
    pub idlecolor: String,

    /// Background color for ATIS exposure measurements
    #[arg(short = 'x', long, default_value = DEFAULT_ATIS_COLOR, value_name = "COLOR")]
    pub atiscolor: String,

    /// Add a timecode overlay
    #[arg(short = 'a', long)]
    pub add_timecode: bool,

    /// Scale up the output by an integer factor
    #[arg(short = 'c', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..), value_name = "FACTOR")]
    pub scale: u32,

    /// Ratio of pixels discarded for cumulative mapping
    #[arg(short = 'm', long, default_value_t = 0.01, value_name = "RATIO")]
    pub cumulative_ratio: f64,

    /// Explicit cumulative-mapping maximum activity
    #[arg(long, value_name = "ACTIVITY")]
    pub lambda_max: Option<f64>,

    /// Ratio of pixels discarded for tone mapping (ATIS only)
    #[arg(short = 'r', long, default_value_t = 0.01, value_name = "RATIO")]
    pub discard_ratio: f64,

    /// Black integration duration for tone mapping (timecode, ATIS only)
    #[arg(short = 'v', long, value_parser = Micros::parse, value_name = "TIMECODE")]
    pub black: Option<Micros>,

    /// White integration duration for tone mapping (timecode, ATIS only)
    #[arg(short = 'w', long, value_parser = Micros::parse, value_name = "TIMECODE")]
    pub white: Option<Micros>,

    /// H.264 CRF quality (lower is better)
    #[arg(long, default_value_t = DEFAULT_CRF, value_parser = clap::value_parser!(u8).range(0..=51), value_name = "CRF")]
    pub crf: u8,

    /// Use AV1 (librav1e) instead of H.264
    #[arg(short = 'u', long)]
    pub av1: bool,

    /// Render a sound track alongside the video
    #[arg(long, conflicts_with = "image")]
    pub sonify: bool,

    /// Render only the sound track
    #[arg(long, conflicts_with = "image")]
    pub sound_only: bool,

    /// Keep video and sound as separate files instead of merging them
    #[arg(long)]
    pub skip_merge: bool,

    /// Activity to amplitude conversion factor
    #[arg(long, default_value_t = 0.1, value_name = "GAIN")]
    pub amplitude_gain: f64,

    /// Frequency mapped to the bottom pixel row, in Hertz
    #[arg(long, default_value_t = 27.5, value_name = "HZ")]
    pub minimum_frequency: f64,

    /// Frequency mapped to the top pixel row, in Hertz
    #[arg(long, default_value_t = 4186.009, value_name = "HZ")]
    pub maximum_frequency: f64,

    /// Sound sampling rate in Hertz
    #[arg(long, default_value_t = 44_100, value_name = "HZ")]
    pub sampling_rate: u32,

    /// Row tracker moving mean parameter
    #[arg(long, default_value_t = 0.1, value_name = "LAMBDA")]
    pub tracker_lambda: f64,

    /// Row activity decay (timecode)
    #[arg(long, default_value = "10000", value_parser = Micros::parse, value_name = "TIMECODE")]
    pub activity_tau: Micros,

    /// Render a single still image (PNG) instead of a video
    #[arg(long)]
    pub image: bool,

    /// FFmpeg executable
    #[arg(short = 'g', long, default_value = "ffmpeg", value_name = "PATH")]
    pub ffmpeg: PathBuf,

    /// Frame generator executable
    #[arg(long, default_value = "es_to_frames", value_name = "PATH")]
    pub es_to_frames: PathBuf,

    /// Synthesizer executable
    #[arg(long, default_value = "synth", value_name = "PATH")]
    pub synth: PathBuf,

    /// Frame-dimension query executable
    #[arg(long, default_value = "size", value_name = "PATH")]
    pub size: PathBuf,
}

fn parse_style(name: &str) -> Result<DecayStyle, String> {
    DecayStyle::from_name(name).ok_or_else(|| {
        format!(
            "unknown style '{name}' (expected exponential, linear, window, cumulative, \
             or cumulative-shared)"
        )
    })
}

impl Cli {
    /// Converts the parsed arguments into validated render parameters.
    pub fn into_parameters(self) -> CoreResult<RenderParameters> {
        if !self.input.exists() {
            return Err(CoreError::MissingInput(format!(
                "{} does not exist",
                self.input.display()
            )));
        }

        let mut params = RenderParameters::new(self.input);
        params.begin = self.begin;
        params.end = self.end;
        params.frametime = self.frametime;
        params.style = self.style;
        params.tau = self.tau;
        params.on_color = self.oncolor;
        params.off_color = self.offcolor;
        params.idle_color = self.idlecolor;
        params.atis_color = self.atiscolor;
        params.add_timecode = self.add_timecode;
        params.scale = self.scale;
        params.cumulative_ratio = self.cumulative_ratio;
        params.lambda_max = self.lambda_max;
        params.discard_ratio = self.discard_ratio;
        params.black = self.black;
        params.white = self.white;
        params.codec = if self.av1 { Codec::Av1 } else { Codec::H264 };
        params.crf = self.crf;
        params.sonify = self.sonify;
        params.sound_only = self.sound_only;
        params.merge = !self.skip_merge;
        params.image = self.image;
        params.sound.amplitude_gain = self.amplitude_gain;
        params.sound.minimum_frequency = self.minimum_frequency;
        params.sound.maximum_frequency = self.maximum_frequency;
        params.sound.sampling_rate = self.sampling_rate;
        params.sound.tracker_lambda = self.tracker_lambda;
        params.sound.activity_tau = self.activity_tau;
        params.tools.ffmpeg = self.ffmpeg;
        params.tools.es_to_frames = self.es_to_frames;
        params.tools.synth = self.synth;
        params.tools.size = self.size;

        match self.output {
            Some(path) if params.input.is_dir() => {
                if path.exists() && !path.is_dir() {
                    return Err(CoreError::InvalidOutput(format!(
                        "directory input requires a directory output, got {}",
                        path.display()
                    )));
                }
                params.output_dir = Some(path);
            }
            Some(path) if path.is_dir() => params.output_dir = Some(path),
            Some(path) => params.output = Some(path),
            None => {}
        }

        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::parse_from(["esrender", "recording.es"]);
        assert_eq!(cli.input, PathBuf::from("recording.es"));
        assert_eq!(cli.output, None);
        assert_eq!(cli.begin, Micros(0));
        assert_eq!(cli.end, None);
        assert_eq!(cli.frametime, Micros(20_000));
        assert_eq!(cli.style, DecayStyle::Exponential);
        assert_eq!(cli.tau, Micros(200_000));
        assert_eq!(cli.scale, 1);
        assert!(!cli.sonify);
        assert!(!cli.skip_merge);
        assert!(!cli.av1);
    }

    #[test]
    fn parses_timecode_valued_flags() {
        let cli = Cli::parse_from([
            "esrender",
            "recording.es",
            "--begin",
            "0:00:01.5",
            "--end",
            "0:01:00",
            "--frametime",
            "40000",
            "--tau",
            "0:00:00.1",
        ]);
        assert_eq!(cli.begin, Micros(1_500_000));
        assert_eq!(cli.end, Some(Micros(60_000_000)));
        assert_eq!(cli.frametime, Micros(40_000));
        assert_eq!(cli.tau, Micros(100_000));
    }

    #[test]
    fn rejects_malformed_timecodes() {
        assert!(Cli::try_parse_from(["esrender", "r.es", "--begin", "1:2"]).is_err());
        assert!(Cli::try_parse_from(["esrender", "r.es", "--end", "abc"]).is_err());
    }

    #[test]
    fn rejects_unknown_styles_and_zero_scale() {
        assert!(Cli::try_parse_from(["esrender", "r.es", "--style", "sigmoid"]).is_err());
        assert!(Cli::try_parse_from(["esrender", "r.es", "--scale", "0"]).is_err());
    }

    #[test]
    fn image_conflicts_with_sonification() {
        assert!(Cli::try_parse_from(["esrender", "r.es", "--image", "--sonify"]).is_err());
        assert!(Cli::try_parse_from(["esrender", "r.es", "--image", "--sound-only"]).is_err());
        assert!(Cli::try_parse_from(["esrender", "r.es", "--image"]).is_ok());
    }

    #[test]
    fn parses_sonification_parameters() {
        let cli = Cli::parse_from([
            "esrender",
            "recording.es",
            "--sonify",
            "--skip-merge",
            "--amplitude-gain",
            "0.25",
            "--sampling-rate",
            "48000",
            "--activity-tau",
            "0:00:00.02",
        ]);
        assert!(cli.sonify);
        assert!(cli.skip_merge);
        assert_eq!(cli.amplitude_gain, 0.25);
        assert_eq!(cli.sampling_rate, 48_000);
        assert_eq!(cli.activity_tau, Micros(20_000));
    }

    #[test]
    fn parses_tool_overrides() {
        let cli = Cli::parse_from([
            "esrender",
            "recording.es",
            "--ffmpeg",
            "/opt/ffmpeg/bin/ffmpeg",
            "--es-to-frames",
            "./build/es_to_frames",
        ]);
        assert_eq!(cli.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(cli.es_to_frames, PathBuf::from("./build/es_to_frames"));
        assert_eq!(cli.synth, PathBuf::from("synth"));
        assert_eq!(cli.size, PathBuf::from("size"));
    }
}
