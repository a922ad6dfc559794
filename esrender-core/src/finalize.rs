//! Artifact finalization.
//!
//! The final output path is only ever mutated by renaming a complete
//! temporary into it. Renames stay on one filesystem (the temporaries are
//! siblings of their targets), so an external observer sees either the old
//! artifact, nothing, or the new artifact, never a partial write.

use crate::config::RenderParameters;
use crate::error::CoreResult;
use crate::external::{self, ffmpeg};
use crate::temp_files;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Moves a completed temporary into its final place, replacing any previous
/// artifact with a single rename.
pub fn replace_file(temp: &Path, final_path: &Path) -> CoreResult<()> {
    match fs::remove_file(final_path) {
        Ok(()) => log::debug!("replaced previous artifact {}", final_path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    fs::rename(temp, final_path)?;
    log::info!("wrote {}", final_path.display());
    Ok(())
}

/// Muxes the rendered video and audio temporaries into the final container.
///
/// The mux writes to a `.merge` sibling of the final path, so a mux failure
/// or interrupt leaves the previous artifact untouched. On success both
/// render temporaries are deleted.
pub fn merge_streams(
    params: &RenderParameters,
    video_temp: &Path,
    audio_temp: &Path,
    final_path: &Path,
) -> CoreResult<()> {
    let merge_temp = temp_files::merge_path(final_path);

    let cmd = ffmpeg::merge_command(params, video_temp, audio_temp, &merge_temp);
    let proc = ffmpeg::spawn(cmd, false)?;
    external::wait_tool("ffmpeg", proc.child, proc.stderr_drain)?;

    replace_file(&merge_temp, final_path)?;
    fs::remove_file(video_temp)?;
    fs::remove_file(audio_temp)?;
    Ok(())
}
