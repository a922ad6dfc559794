//! Frame generator invocation.
//!
//! `es_to_frames` reads the event stream on stdin and writes successive raw
//! rgb24 frames to stdout with no framing; the frame size is implied by the
//! sensor dimensions and the end of the stream by a short read.

use crate::config::RenderParameters;
use crate::error::CoreResult;
use std::fs::File;
use std::process::{Child, Command, Stdio};

/// Spawns the frame generator with the full parameter set serialized as
/// flags. Its stdout is piped; its stderr passes through to the terminal.
pub fn spawn(params: &RenderParameters) -> CoreResult<Child> {
    let input = File::open(&params.input)?;

    let mut cmd = Command::new(&params.tools.es_to_frames);
    cmd.arg(format!("--begin={}", params.begin))
        .arg(format!("--frametime={}", params.frametime))
        .arg(format!("--style={}", params.style.as_str()))
        .arg(format!("--tau={}", params.tau))
        .arg(format!("--oncolor={}", params.on_color))
        .arg(format!("--offcolor={}", params.off_color))
        .arg(format!("--idlecolor={}", params.idle_color))
        .arg(format!("--scale={}", params.scale))
        .arg(format!("--cumulative-ratio={}", params.cumulative_ratio))
        .arg(format!("--discard-ratio={}", params.discard_ratio))
        .arg(format!("--atiscolor={}", params.atis_color));
    if let Some(end) = params.end {
        cmd.arg(format!("--end={end}"));
    }
    if let Some(lambda_max) = params.lambda_max {
        cmd.arg(format!("--lambda-max={lambda_max}"));
    }
    if let Some(black) = params.black {
        cmd.arg(format!("--black={black}"));
    }
    if let Some(white) = params.white {
        cmd.arg(format!("--white={white}"));
    }
    if params.add_timecode {
        cmd.arg("--add-timecode");
    }
    cmd.stdin(Stdio::from(input))
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    log::debug!("spawning frame generator: {cmd:?}");
    super::spawn_tool(&mut cmd, &super::tool_name(&params.tools.es_to_frames))
}
