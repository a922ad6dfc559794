//! The process pipeline coordinator.
//!
//! One render drives up to three external processes: the frame generator,
//! the encoder, and the synthesizer. The coordinator owns them for the
//! duration of the render through a scoped guard, relays frames from the
//! generator to the encoder one frame at a time (the pipe itself provides
//! back-pressure), and hands the completed temporaries to the finalizer.

use crate::config::RenderParameters;
use crate::error::{CoreError, CoreResult};
use crate::external::{self, ffmpeg, generator, probe, synth};
use crate::finalize;
use crate::outputs::{plan_outputs, OutputPlan};
use crate::temp_files;
use crate::timecode::Micros;
use indicatif::ProgressBar;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Requests cancellation of the render in progress.
///
/// Safe to call from a signal handler; the coordinator polls the flag at
/// every blocking-loop iteration and unwinds through the scoped guard,
/// killing every still-active child.
pub fn request_interrupt() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// The set of child processes active for one artifact render.
///
/// Each slot is independently nullable. A process that has been waited on is
/// taken out of its slot first, so the drop guard never signals an already
/// reaped child; whatever is still registered when the run unwinds (error,
/// interrupt, panic) is force-killed and reaped.
#[derive(Default)]
pub struct PipelineRun {
    pub(crate) generator: Option<Child>,
    pub(crate) encoder: Option<Child>,
    pub(crate) synthesizer: Option<Child>,
}

impl PipelineRun {
    fn kill_slot(slot: &mut Option<Child>) {
        if let Some(mut child) = slot.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Force-terminates every still-registered child.
    pub fn kill_all(&mut self) {
        Self::kill_slot(&mut self.generator);
        Self::kill_slot(&mut self.encoder);
        Self::kill_slot(&mut self.synthesizer);
    }
}

impl Drop for PipelineRun {
    fn drop(&mut self) {
        self.kill_all();
    }
}

/// What a completed render produced.
#[derive(Debug)]
pub struct RenderOutcome {
    /// The final artifact paths.
    pub plan: OutputPlan,
    /// Number of frames relayed to the encoder (0 for sound-only renders).
    pub frames: u64,
    /// Wall-clock render time.
    pub elapsed: Duration,
}

/// Renders one input file end to end: validation, output planning, the
/// generator/encoder pipeline, the optional synthesizer pass, and
/// finalization.
pub fn render_file(params: &RenderParameters) -> CoreResult<RenderOutcome> {
    let start = Instant::now();
    params.validate()?;
    if !params.input.is_file() {
        return Err(CoreError::MissingInput(format!(
            "{} is not a file",
            params.input.display()
        )));
    }
    let plan = plan_outputs(params)?;
    if let Some(parent) = plan.primary().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut run = PipelineRun::default();
    let mut frames = 0;
    let mut video_temp: Option<PathBuf> = None;
    let mut audio_temp: Option<PathBuf> = None;

    if params.wants_video() {
        let visual_final = plan
            .video
            .as_deref()
            .or(plan.image.as_deref())
            .expect("video mode always plans a visual artifact");
        let temp = temp_files::render_path(visual_final);
        frames = run_visual_pipeline(params, &mut run, &temp)?;
        video_temp = Some(temp);
    }

    if params.wants_audio() {
        // When merging, the sound track is rendered next to the video under
        // its would-be standalone name and consumed by the mux step.
        let audio_target = plan.audio.clone().unwrap_or_else(|| {
            plan.video
                .as_ref()
                .expect("merged audio implies a video artifact")
                .with_extension("wav")
        });
        let temp = temp_files::render_path(&audio_target);
        run_sound_pipeline(params, &mut run, &temp)?;
        audio_temp = Some(temp);
    }

    // All children have been waited on; the guard's slots are empty.
    drop(run);
    finalize_artifacts(params, &plan, video_temp, audio_temp)?;

    Ok(RenderOutcome {
        plan,
        frames,
        elapsed: start.elapsed(),
    })
}

/// Steps 1-5 of the visual pipeline: probe dimensions, spawn the generator
/// and the encoder, relay frames, and wait for both.
fn run_visual_pipeline(
    params: &RenderParameters,
    run: &mut PipelineRun,
    temp: &Path,
) -> CoreResult<u64> {
    let (width, height) = probe::query_dimensions(params)?;
    let frame_size = width as usize * height as usize * 3;

    run.generator = Some(generator::spawn(params)?);

    let cmd = if params.image {
        ffmpeg::still_command(params, width, height, temp)
    } else {
        ffmpeg::encoder_command(params, width, height, temp)
    };
    let encoder = ffmpeg::spawn(cmd, true)?;
    let stderr_drain = encoder.stderr_drain;
    run.encoder = Some(encoder.child);

    let limit = params.image.then_some(1);
    let relay = relay_frames(params, run, frame_size, limit)?;
    let frames = relay.frames;

    if relay.encoder_hung_up {
        // The encoder stopped reading mid-stream; its exit status carries the
        // diagnosis. The generator died of the closed pipe (or is about to),
        // so its status is just teardown noise.
        PipelineRun::kill_slot(&mut run.generator);
    } else if limit.is_some_and(|limit| frames == limit) {
        // The generator keeps streaming past the frame limit; stopping it is
        // part of the normal still-image path.
        PipelineRun::kill_slot(&mut run.generator);
    } else {
        // The frame stream ended on its own, possibly before producing
        // anything; the generator's exit status is checked first.
        let generator = run
            .generator
            .take()
            .ok_or_else(|| CoreError::Other("frame generator not running".to_string()))?;
        external::wait_tool(&external::tool_name(&params.tools.es_to_frames), generator, None)?;
    }

    let encoder = run
        .encoder
        .take()
        .ok_or_else(|| CoreError::Other("encoder not running".to_string()))?;
    external::wait_tool("ffmpeg", encoder, stderr_drain)?;

    log::info!(
        "encoded {frames} frame(s) of {} at {width}x{height}",
        params.input.display()
    );
    Ok(frames)
}

/// How the frame relay ended.
struct RelayOutcome {
    frames: u64,
    /// The encoder closed its read end before the frame stream ended; its
    /// exit status, not the generator's, explains what happened.
    encoder_hung_up: bool,
}

/// The data-plane copy loop: exactly one frame in transit at a time.
///
/// A read shorter than one frame marks the end of the stream; closing the
/// encoder's stdin afterwards ends its stream in turn.
fn relay_frames(
    params: &RenderParameters,
    run: &mut PipelineRun,
    frame_size: usize,
    limit: Option<u64>,
) -> CoreResult<RelayOutcome> {
    let mut source = run
        .generator
        .as_mut()
        .and_then(|child| child.stdout.take())
        .ok_or_else(|| CoreError::Other("frame generator stdout not piped".to_string()))?;
    let mut sink = run
        .encoder
        .as_mut()
        .and_then(|child| child.stdin.take())
        .ok_or_else(|| CoreError::Other("encoder stdin not piped".to_string()))?;

    let progress = ProgressBar::new_spinner();
    let mut frame = vec![0u8; frame_size];
    let mut frames: u64 = 0;
    let mut encoder_hung_up = false;
    loop {
        if interrupted() {
            return Err(CoreError::Interrupted);
        }
        let filled = read_frame(&mut source, &mut frame)?;
        if filled < frame_size {
            break;
        }
        match sink.write_all(&frame) {
            Ok(()) => {}
            // The encoder went away; its exit status tells the real story.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                encoder_hung_up = true;
                break;
            }
            Err(e) => return Err(e.into()),
        }
        frames += 1;
        if frames % 25 == 0 {
            let position = Micros(params.begin.as_u64() + frames * params.frametime.as_u64());
            progress.set_message(format!("frame {frames} ({})", position.timecode()));
            progress.tick();
        }
        if limit == Some(frames) {
            break;
        }
    }
    progress.finish_and_clear();
    drop(sink);
    Ok(RelayOutcome {
        frames,
        encoder_hung_up,
    })
}

/// Reads until `frame` is full or the stream ends; returns the filled size.
fn read_frame(source: &mut impl Read, frame: &mut [u8]) -> CoreResult<usize> {
    let mut filled = 0;
    while filled < frame.len() {
        match source.read(&mut frame[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Runs the synthesizer against its own temporary output, forwarding its
/// carriage-return progress stream verbatim.
fn run_sound_pipeline(
    params: &RenderParameters,
    run: &mut PipelineRun,
    temp: &Path,
) -> CoreResult<()> {
    run.synthesizer = Some(synth::spawn(params, temp)?);

    let mut source = run
        .synthesizer
        .as_mut()
        .and_then(|child| child.stdout.take())
        .ok_or_else(|| CoreError::Other("synthesizer stdout not piped".to_string()))?;
    let mut stdout = std::io::stdout();
    let mut chunk = [0u8; 256];
    let mut forwarded = false;
    loop {
        if interrupted() {
            return Err(CoreError::Interrupted);
        }
        match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                stdout.write_all(&chunk[..n])?;
                stdout.flush()?;
                forwarded = true;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    if forwarded {
        // The last progress line has no trailing newline.
        writeln!(stdout)?;
    }

    let synthesizer = run
        .synthesizer
        .take()
        .ok_or_else(|| CoreError::Other("synthesizer not running".to_string()))?;
    external::wait_tool(&external::tool_name(&params.tools.synth), synthesizer, None)
}

/// Turns the completed temporaries into the final artifacts.
fn finalize_artifacts(
    params: &RenderParameters,
    plan: &OutputPlan,
    video_temp: Option<PathBuf>,
    audio_temp: Option<PathBuf>,
) -> CoreResult<()> {
    match (video_temp, audio_temp) {
        (Some(video), Some(audio)) if params.merge => {
            let final_path = plan
                .video
                .as_deref()
                .expect("merged renders have a video artifact");
            finalize::merge_streams(params, &video, &audio, final_path)
        }
        (video, audio) => {
            if let Some(temp) = video {
                let final_path = plan
                    .video
                    .as_deref()
                    .or(plan.image.as_deref())
                    .expect("a visual temp implies a visual artifact");
                finalize::replace_file(&temp, final_path)?;
            }
            if let Some(temp) = audio {
                let final_path = plan
                    .audio
                    .as_deref()
                    .expect("an unmerged audio temp implies an audio artifact");
                finalize::replace_file(&temp, final_path)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_frame_fills_exactly_one_frame() {
        let mut source = Cursor::new(vec![7u8; 10]);
        let mut frame = [0u8; 4];
        assert_eq!(read_frame(&mut source, &mut frame).unwrap(), 4);
        assert_eq!(frame, [7; 4]);
        assert_eq!(read_frame(&mut source, &mut frame).unwrap(), 4);
        // The trailing partial read marks the end of the stream.
        assert_eq!(read_frame(&mut source, &mut frame).unwrap(), 2);
    }

    #[test]
    fn read_frame_reports_empty_stream() {
        let mut source = Cursor::new(Vec::<u8>::new());
        let mut frame = [0u8; 4];
        assert_eq!(read_frame(&mut source, &mut frame).unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn guard_kills_registered_children_on_drop() {
        use std::process::{Command, Stdio};

        let child = Command::new("sleep")
            .arg("30")
            .stdin(Stdio::null())
            .spawn()
            .expect("spawn sleep");
        let pid = child.id().to_string();

        let mut run = PipelineRun::default();
        run.generator = Some(child);
        drop(run);

        // Signal 0 probes liveness; a killed and reaped child is gone.
        let alive = Command::new("kill")
            .args(["-0", &pid])
            .stderr(Stdio::null())
            .status()
            .expect("run kill")
            .success();
        assert!(!alive, "child {pid} should have been terminated by the guard");
    }

    #[cfg(unix)]
    #[test]
    fn waited_children_leave_their_slot() {
        use std::process::{Command, Stdio};

        let child = Command::new("true")
            .stdin(Stdio::null())
            .spawn()
            .expect("spawn true");
        let mut run = PipelineRun::default();
        run.synthesizer = Some(child);

        let reaped = run.synthesizer.take().unwrap();
        external::wait_tool("true", reaped, None).unwrap();
        assert!(run.synthesizer.is_none());
        // Dropping the guard afterwards must not touch the reaped process.
        drop(run);
    }
}
