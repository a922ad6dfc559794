//! Synthesizer invocation.
//!
//! `synth` converts the event stream to a stereo WAV file on its own. It
//! reports progress as single lines on stdout, each starting with a carriage
//! return so the previous one is overwritten in place.

use crate::config::RenderParameters;
use crate::error::CoreResult;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Spawns the synthesizer writing to `output`.
///
/// The playback speed is derived from the frame interval: a frametime of
/// 20000 us is real time, shorter frametimes slow the sound down with the
/// video and longer ones speed it up.
pub fn spawn(params: &RenderParameters, output: &Path) -> CoreResult<Child> {
    let playback_speed = params.frametime.as_u64() as f64 / 20_000.0;

    let mut cmd = Command::new(&params.tools.synth);
    cmd.arg(format!("--begin={}", params.begin));
    if let Some(end) = params.end {
        cmd.arg(format!("--end={end}"));
    }
    cmd.arg(format!("--amplitude-gain={}", params.sound.amplitude_gain))
        .arg(format!("--minimum-frequency={}", params.sound.minimum_frequency))
        .arg(format!("--maximum-frequency={}", params.sound.maximum_frequency))
        .arg(format!("--sampling-rate={}", params.sound.sampling_rate))
        .arg(format!("--tracker-lambda={}", params.sound.tracker_lambda))
        .arg(format!("--activity-tau={}", params.sound.activity_tau))
        .arg(format!("--playback-speed={playback_speed}"))
        .arg("--output-mode=0")
        .arg(&params.input)
        .arg(output);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    log::debug!("spawning synthesizer: {cmd:?}");
    super::spawn_tool(&mut cmd, &super::tool_name(&params.tools.synth))
}
