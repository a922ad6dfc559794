//! Render parameters and their defaults.
//!
//! `RenderParameters` is the immutable value set for one invocation. It is
//! built once (by the CLI or a library consumer), validated, and then passed
//! by reference to every downstream stage: output path derivation, the
//! process pipeline, finalization, and batch traversal.

use crate::error::{CoreError, CoreResult};
use crate::timecode::Micros;
use std::path::PathBuf;

/// Nominal output frame rate, fixed by the frame generator contract.
pub const FRAME_RATE: u32 = 50;

/// Default time between two frames (20 ms, i.e. real time at 50 fps).
pub const DEFAULT_FRAMETIME: Micros = Micros(20_000);

/// Default decay function parameter.
pub const DEFAULT_TAU: Micros = Micros(200_000);

/// Default H.264 CRF quality.
pub const DEFAULT_CRF: u8 = 18;

pub const DEFAULT_ON_COLOR: &str = "#f4c20d";
pub const DEFAULT_OFF_COLOR: &str = "#1e88e5";
pub const DEFAULT_IDLE_COLOR: &str = "#292929";
pub const DEFAULT_ATIS_COLOR: &str = "#000000";

/// Temporal falloff function applied per pixel by the frame generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayStyle {
    Exponential,
    Linear,
    Window,
    Cumulative,
    CumulativeShared,
}

impl DecayStyle {
    /// The name understood by the frame generator (and embedded in derived
    /// file names).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DecayStyle::Exponential => "exponential",
            DecayStyle::Linear => "linear",
            DecayStyle::Window => "window",
            DecayStyle::Cumulative => "cumulative",
            DecayStyle::CumulativeShared => "cumulative-shared",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "exponential" => DecayStyle::Exponential,
            "linear" => DecayStyle::Linear,
            "window" => DecayStyle::Window,
            "cumulative" => DecayStyle::Cumulative,
            "cumulative-shared" => DecayStyle::CumulativeShared,
            _ => return None,
        })
    }
}

/// Video codec selection for the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// libx264 with the configured CRF.
    H264,
    /// librav1e, speed 3, one thread per CPU.
    Av1,
}

/// Sonification parameters, passed through to the synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundParams {
    /// Activity to amplitude conversion factor.
    pub amplitude_gain: f64,
    /// Frequency mapped to the bottom pixel row, in Hertz.
    pub minimum_frequency: f64,
    /// Frequency mapped to the top pixel row, in Hertz.
    pub maximum_frequency: f64,
    /// Output sampling rate in Hertz.
    pub sampling_rate: u32,
    /// Row tracker moving mean parameter.
    pub tracker_lambda: f64,
    /// Row activity decay.
    pub activity_tau: Micros,
}

impl Default for SoundParams {
    fn default() -> Self {
        SoundParams {
            amplitude_gain: 0.1,
            minimum_frequency: 27.5,
            maximum_frequency: 4186.009,
            sampling_rate: 44_100,
            tracker_lambda: 0.1,
            activity_tau: Micros(10_000),
        }
    }
}

/// Paths to the external executables driven by the pipeline.
///
/// The defaults are bare names, resolved through `PATH` like any other
/// command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub ffmpeg: PathBuf,
    pub es_to_frames: PathBuf,
    pub synth: PathBuf,
    pub size: PathBuf,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            ffmpeg: PathBuf::from("ffmpeg"),
            es_to_frames: PathBuf::from("es_to_frames"),
            synth: PathBuf::from("synth"),
            size: PathBuf::from("size"),
        }
    }
}

/// The full parameter set for one render invocation.
#[derive(Debug, Clone)]
pub struct RenderParameters {
    /// Input `.es` file (or directory in batch mode).
    pub input: PathBuf,
    /// Explicit output path; derived from the input name when absent.
    pub output: Option<PathBuf>,
    /// Directory for derived outputs; the input's directory when absent.
    pub output_dir: Option<PathBuf>,

    /// Ignore events before this timestamp.
    pub begin: Micros,
    /// Ignore events at or after this timestamp; unbounded when absent.
    pub end: Option<Micros>,
    /// Time between two frames.
    pub frametime: Micros,

    pub style: DecayStyle,
    /// Decay function parameter.
    pub tau: Micros,

    pub on_color: String,
    pub off_color: String,
    pub idle_color: String,
    /// Background color for ATIS exposure measurements.
    pub atis_color: String,
    /// Draw a timecode overlay on every frame.
    pub add_timecode: bool,
    /// Integer upscale factor applied to the generator's output.
    pub scale: u32,

    /// Ratio of pixels discarded for cumulative mapping.
    pub cumulative_ratio: f64,
    /// Explicit cumulative-mapping maximum activity.
    pub lambda_max: Option<f64>,
    /// Ratio of pixels discarded for tone mapping (ATIS only).
    pub discard_ratio: f64,
    /// Black integration duration for tone mapping (ATIS only).
    pub black: Option<Micros>,
    /// White integration duration for tone mapping (ATIS only).
    pub white: Option<Micros>,

    pub codec: Codec,
    /// H.264 CRF quality (ignored for AV1).
    pub crf: u8,

    /// Render an audio track alongside the video.
    pub sonify: bool,
    /// Render only the audio track.
    pub sound_only: bool,
    pub sound: SoundParams,
    /// Merge video and audio into a single container (on by default).
    pub merge: bool,

    /// Render a single still image instead of a video.
    pub image: bool,

    pub tools: Tools,
}

impl RenderParameters {
    /// Parameters for `input` with every other value at its default.
    #[must_use]
    pub fn new(input: impl Into<PathBuf>) -> Self {
        RenderParameters {
            input: input.into(),
            output: None,
            output_dir: None,
            begin: Micros(0),
            end: None,
            frametime: DEFAULT_FRAMETIME,
            style: DecayStyle::Exponential,
            tau: DEFAULT_TAU,
            on_color: DEFAULT_ON_COLOR.to_string(),
            off_color: DEFAULT_OFF_COLOR.to_string(),
            idle_color: DEFAULT_IDLE_COLOR.to_string(),
            atis_color: DEFAULT_ATIS_COLOR.to_string(),
            add_timecode: false,
            scale: 1,
            cumulative_ratio: 0.01,
            lambda_max: None,
            discard_ratio: 0.01,
            black: None,
            white: None,
            codec: Codec::H264,
            crf: DEFAULT_CRF,
            sonify: false,
            sound_only: false,
            sound: SoundParams::default(),
            merge: true,
            image: false,
            tools: Tools::default(),
        }
    }

    /// Whether a video (or still) pipeline is required at all.
    #[must_use]
    pub fn wants_video(&self) -> bool {
        !self.sound_only
    }

    /// Whether the synthesizer runs.
    #[must_use]
    pub fn wants_audio(&self) -> bool {
        self.sonify || self.sound_only
    }

    /// Checks the invariants that must hold before any process is spawned.
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(end) = self.end {
            if end <= self.begin {
                return Err(CoreError::InvalidDuration(format!(
                    "end ({end}) must be greater than begin ({})",
                    self.begin
                )));
            }
        }
        if self.scale == 0 {
            return Err(CoreError::Other("scale must be at least 1".to_string()));
        }
        if self.image && self.wants_audio() {
            return Err(CoreError::InvalidOutput(
                "a still image render cannot carry an audio track".to_string(),
            ));
        }
        Ok(())
    }
}
