//! FFmpeg command construction and execution.
//!
//! FFmpeg appears twice in a render: as the encoder consuming raw rgb24
//! frames on stdin, and (for merged sonification) as the muxer combining the
//! two pre-rendered temporary files. Both write to `.render`/`.merge`
//! siblings of the final path, so the container format is forced explicitly
//! rather than inferred from the extension.

use crate::config::{Codec, RenderParameters, FRAME_RATE};
use crate::error::CoreResult;
use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;

/// A spawned ffmpeg child plus the thread draining its stderr.
///
/// The drain prevents the stderr pipe from filling up while the data plane
/// is busy writing frames, and buffers the output for failure reports.
pub(crate) struct FfmpegProc {
    pub child: Child,
    pub stderr_drain: Option<JoinHandle<io::Result<Vec<u8>>>>,
}

fn base_command(params: &RenderParameters) -> Command {
    let mut cmd = Command::new(&params.tools.ffmpeg);
    cmd.args(["-hide_banner", "-loglevel", "warning", "-nostats"]);
    cmd
}

fn rawvideo_input(cmd: &mut Command, width: u32, height: u32) {
    cmd.args(["-f", "rawvideo"])
        .args(["-s", &format!("{width}x{height}")])
        .args(["-framerate", &FRAME_RATE.to_string()])
        .args(["-pix_fmt", "rgb24"])
        .args(["-i", "-"]);
}

/// The encoder command: raw frames on stdin, a video container at `dest`.
pub(crate) fn encoder_command(
    params: &RenderParameters,
    width: u32,
    height: u32,
    dest: &Path,
) -> Command {
    let mut cmd = base_command(params);
    rawvideo_input(&mut cmd, width, height);
    match params.codec {
        Codec::H264 => {
            cmd.args(["-c:v", "libx264"])
                .args(["-pix_fmt", "yuv420p"])
                .args(["-crf", &params.crf.to_string()]);
        }
        Codec::Av1 => {
            let threads = std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1);
            cmd.args(["-c:v", "librav1e"])
                .args(["-rav1e-params", &format!("speed=3:threads={threads}")]);
        }
    }
    cmd.args(["-f", "mp4", "-y"]).arg(dest);
    cmd
}

/// The still-image command: one raw frame on stdin, a PNG at `dest`.
pub(crate) fn still_command(
    params: &RenderParameters,
    width: u32,
    height: u32,
    dest: &Path,
) -> Command {
    let mut cmd = base_command(params);
    rawvideo_input(&mut cmd, width, height);
    cmd.args(["-frames:v", "1"])
        .args(["-c:v", "png"])
        .args(["-f", "image2", "-y"])
        .arg(dest);
    cmd
}

/// The mux command: copies the video stream untouched, transcodes the audio
/// to AAC, and forces a stereo layout.
pub(crate) fn merge_command(
    params: &RenderParameters,
    video: &Path,
    audio: &Path,
    dest: &Path,
) -> Command {
    let mut cmd = base_command(params);
    // The `.render` suffixes defeat extension-based demuxer detection, so
    // each input's format is stated explicitly.
    cmd.args(["-f", "mp4"])
        .arg("-i")
        .arg(video)
        .args(["-f", "wav"])
        .arg("-i")
        .arg(audio)
        .args(["-c:v", "copy"])
        .args(["-c:a", "aac"])
        .args(["-ac", "2"])
        .args(["-f", "mp4", "-y"])
        .arg(dest);
    cmd
}

/// Spawns an ffmpeg command with stderr drained on a thread.
///
/// `piped_stdin` selects between the encoder shape (frames written by the
/// relay loop) and the muxer shape (file inputs only).
pub(crate) fn spawn(mut cmd: Command, piped_stdin: bool) -> CoreResult<FfmpegProc> {
    cmd.stdin(if piped_stdin {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::null())
    .stderr(Stdio::piped());

    log::debug!("spawning ffmpeg: {cmd:?}");
    let mut child = super::spawn_tool(&mut cmd, "ffmpeg")?;
    let stderr_drain = super::drain_stderr(&mut child);
    Ok(FfmpegProc { child, stderr_drain })
}
