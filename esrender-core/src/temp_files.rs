//! Naming for render-in-progress artifacts.
//!
//! Every intermediate file is a sibling of its final artifact, named by
//! appending a reserved suffix to the full file name (`out.mp4` ->
//! `out.mp4.render`). Keeping temporaries on the same filesystem as the
//! final path is what makes the finalizer's rename atomic.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix for a file still being written by a render step.
pub const RENDER_SUFFIX: &str = "render";

/// Suffix for a file still being written by the merge step.
pub const MERGE_SUFFIX: &str = "merge";

/// Appends `.suffix` to the complete file name of `path`.
#[must_use]
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// The in-progress sibling of a final artifact.
#[must_use]
pub fn render_path(final_path: &Path) -> PathBuf {
    with_suffix(final_path, RENDER_SUFFIX)
}

/// The in-progress sibling of a merged container.
#[must_use]
pub fn merge_path(final_path: &Path) -> PathBuf {
    with_suffix(final_path, MERGE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_extend_the_full_file_name() {
        assert_eq!(
            render_path(Path::new("/out/movie.mp4")),
            PathBuf::from("/out/movie.mp4.render")
        );
        assert_eq!(
            merge_path(Path::new("/out/movie.mp4")),
            PathBuf::from("/out/movie.mp4.merge")
        );
        assert_eq!(
            render_path(Path::new("/out/track.wav")),
            PathBuf::from("/out/track.wav.render")
        );
    }
}
