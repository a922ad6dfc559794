//! Invocation of the external tools the pipeline drives.
//!
//! Four executables are involved: `size` (frame-dimension query),
//! `es_to_frames` (frame generator), `synth` (sonification), and `ffmpeg`
//! (encoding and muxing). This module owns the command construction for each
//! of them plus the shared spawn/wait plumbing.

use crate::error::{child_failed, start_failed, CoreError, CoreResult};
use std::io::{self, ErrorKind};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;

pub mod ffmpeg;
pub mod generator;
pub mod probe;
pub mod synth;

/// The display name of a tool, for error messages.
pub(crate) fn tool_name(tool: &Path) -> String {
    tool.file_name()
        .map_or_else(|| tool.to_string_lossy().into_owned(), |name| {
            name.to_string_lossy().into_owned()
        })
}

/// Checks that a required external command can be started at all.
///
/// The command is run with a cheap probe argument and all streams discarded;
/// only spawnability matters, not the exit status.
pub fn ensure_available(tool: &Path, probe_arg: &str) -> CoreResult<()> {
    let result = Command::new(tool)
        .arg(probe_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("found dependency: {}", tool.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::warn!("dependency '{}' not found", tool.display());
            Err(CoreError::DependencyNotFound(tool_name(tool)))
        }
        Err(e) => Err(start_failed(&tool_name(tool), e)),
    }
}

/// Spawns `cmd`, mapping a missing executable to `DependencyNotFound`.
pub(crate) fn spawn_tool(cmd: &mut Command, tool: &str) -> CoreResult<Child> {
    cmd.spawn().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            CoreError::DependencyNotFound(tool.to_string())
        } else {
            start_failed(tool, e)
        }
    })
}

/// Waits for a child and surfaces a non-zero exit as `ChildProcessFailure`.
///
/// `stderr_drain` is the reader thread attached to a piped stderr, if any;
/// its buffered output becomes part of the failure message.
pub(crate) fn wait_tool(
    tool: &str,
    mut child: Child,
    stderr_drain: Option<JoinHandle<io::Result<Vec<u8>>>>,
) -> CoreResult<()> {
    let status = child.wait()?;
    let stderr = match stderr_drain {
        Some(handle) => match handle.join() {
            Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(Err(e)) => format!("(stderr unavailable: {e})"),
            Err(_) => "(stderr drain thread panicked)".to_string(),
        },
        None => String::new(),
    };
    if status.success() {
        log::debug!("{tool} finished successfully");
        Ok(())
    } else {
        log::error!("{tool} failed with {status}");
        Err(child_failed(tool, status, &stderr))
    }
}

/// Spawns a stderr reader thread for a child whose stderr is piped.
pub(crate) fn drain_stderr(child: &mut Child) -> Option<JoinHandle<io::Result<Vec<u8>>>> {
    let mut stderr = child.stderr.take()?;
    Some(std::thread::spawn(move || {
        use std::io::Read;
        let mut bytes = Vec::new();
        stderr.read_to_end(&mut bytes)?;
        Ok(bytes)
    }))
}
