//! Batch traversal over a directory tree of event streams.
//!
//! Walks the input tree depth-first, rendering every `.es` file and
//! mirroring the directory structure under the output root. Files in a
//! directory are processed before its subdirectories, both in lexicographic
//! order, and every render is isolated: one failure is reported and the walk
//! carries on.

use crate::config::RenderParameters;
use crate::error::{CoreError, CoreResult};
use crate::pipeline;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of one tree traversal.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Number of renders attempted.
    pub attempted: usize,
    /// Number of renders that completed.
    pub succeeded: usize,
    /// Inputs whose render failed, with the error.
    pub failures: Vec<(PathBuf, CoreError)>,
}

impl BatchReport {
    #[must_use]
    pub fn all_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Renders every `.es` file under `input_dir`, mirroring the tree under
/// `output_dir` (or in place when `output_dir` is `None`).
///
/// `template` supplies the render parameters; its input/output fields are
/// replaced per file.
pub fn render_tree(
    template: &RenderParameters,
    input_dir: &Path,
    output_dir: Option<&Path>,
) -> CoreResult<BatchReport> {
    render_tree_with(template, input_dir, output_dir, &mut |params| {
        pipeline::render_file(params).map(|_| ())
    })
}

/// Traversal core, generic over the per-file render function.
pub fn render_tree_with(
    template: &RenderParameters,
    input_dir: &Path,
    output_dir: Option<&Path>,
    render: &mut dyn FnMut(&RenderParameters) -> CoreResult<()>,
) -> CoreResult<BatchReport> {
    if !input_dir.is_dir() {
        return Err(CoreError::MissingInput(format!(
            "{} is not a directory",
            input_dir.display()
        )));
    }
    let output_root = output_dir.unwrap_or(input_dir);
    let mut report = BatchReport::default();
    walk(template, input_dir, output_root, render, &mut report)?;
    Ok(report)
}

fn walk(
    template: &RenderParameters,
    dir: &Path,
    out_dir: &Path,
    render: &mut dyn FnMut(&RenderParameters) -> CoreResult<()>,
    report: &mut BatchReport,
) -> CoreResult<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        // An unreadable directory is reported like a failed file; siblings
        // keep going.
        Err(e) => {
            log::error!("cannot read {}: {e}", dir.display());
            report.failures.push((dir.to_path_buf(), e.into()));
            return Ok(());
        }
    };

    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            // A single unreadable entry is recorded like an unreadable
            // directory; the rest of the scan continues.
            Err(e) => {
                log::error!("cannot scan an entry of {}: {e}", dir.display());
                report.failures.push((dir.to_path_buf(), e.into()));
                continue;
            }
        };
        if path.is_dir() {
            subdirs.push(path);
        } else if is_event_stream(&path) {
            files.push(path);
        }
    }
    files.sort();
    subdirs.sort();

    // The mirrored directory is created lazily, on first use.
    let mut out_ready = false;
    for file in files {
        if !out_ready {
            fs::create_dir_all(out_dir)?;
            out_ready = true;
        }
        let mut params = template.clone();
        params.input = file.clone();
        params.output = None;
        params.output_dir = Some(out_dir.to_path_buf());

        report.attempted += 1;
        match render(&params) {
            Ok(()) => report.succeeded += 1,
            Err(CoreError::Interrupted) => {
                report.failures.push((file, CoreError::Interrupted));
                return Ok(());
            }
            Err(e) => {
                log::error!("render failed for {}: {e}", file.display());
                report.failures.push((file, e));
            }
        }
    }

    for subdir in subdirs {
        let name = match subdir.file_name() {
            Some(name) => name.to_os_string(),
            None => continue,
        };
        walk(template, &subdir, &out_dir.join(name), render, report)?;
        if matches!(report.failures.last(), Some((_, CoreError::Interrupted))) {
            return Ok(());
        }
    }
    Ok(())
}

/// `.es` extension check, case-insensitive.
fn is_event_stream(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("es"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn sample_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.es"));
        touch(&root.join("a.es"));
        touch(&root.join("notes.txt"));
        touch(&root.join("sub2/c.es"));
        touch(&root.join("sub1/d.es"));
        touch(&root.join("sub1/nested/e.es"));
        dir
    }

    #[test]
    fn visits_files_before_subdirectories_in_lexicographic_order() {
        let tree = sample_tree();
        let out = tempfile::tempdir().unwrap();
        let mut visited = Vec::new();
        let template = RenderParameters::new("unused");

        let report = render_tree_with(
            &template,
            tree.path(),
            Some(out.path()),
            &mut |params| {
                visited.push(params.input.clone());
                Ok(())
            },
        )
        .unwrap();

        let relative: Vec<PathBuf> = visited
            .iter()
            .map(|path| path.strip_prefix(tree.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("a.es"),
                PathBuf::from("b.es"),
                PathBuf::from("sub1/d.es"),
                PathBuf::from("sub1/nested/e.es"),
                PathBuf::from("sub2/c.es"),
            ]
        );
        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 5);
        assert!(report.all_ok());
    }

    #[test]
    fn mirrors_the_directory_structure_under_the_output_root() {
        let tree = sample_tree();
        let out = tempfile::tempdir().unwrap();
        let template = RenderParameters::new("unused");

        render_tree_with(&template, tree.path(), Some(out.path()), &mut |params| {
            // Every render targets the mirrored directory for its input.
            let expected = out.path().join(
                params
                    .input
                    .parent()
                    .unwrap()
                    .strip_prefix(tree.path())
                    .unwrap(),
            );
            assert_eq!(params.output_dir.as_deref(), Some(expected.as_path()));
            assert_eq!(params.output, None);
            Ok(())
        })
        .unwrap();

        assert!(out.path().join("sub1/nested").is_dir());
        assert!(out.path().join("sub2").is_dir());
    }

    #[test]
    fn one_failure_does_not_stop_the_walk() {
        let tree = sample_tree();
        let out = tempfile::tempdir().unwrap();
        let template = RenderParameters::new("unused");

        let report = render_tree_with(
            &template,
            tree.path(),
            Some(out.path()),
            &mut |params| {
                if params.input.file_name().unwrap() == "b.es" {
                    Err(CoreError::Other("boom".to_string()))
                } else {
                    Ok(())
                }
            },
        )
        .unwrap();

        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].0.ends_with("b.es"));
    }

    #[test]
    fn an_interrupt_stops_the_walk() {
        let tree = sample_tree();
        let out = tempfile::tempdir().unwrap();
        let template = RenderParameters::new("unused");

        let report = render_tree_with(
            &template,
            tree.path(),
            Some(out.path()),
            &mut |params| {
                if params.input.file_name().unwrap() == "b.es" {
                    Err(CoreError::Interrupted)
                } else {
                    Ok(())
                }
            },
        )
        .unwrap();

        // a.es succeeded, b.es was interrupted, nothing after was attempted.
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 1);
        assert!(matches!(report.failures.as_slice(), [(_, CoreError::Interrupted)]));
    }

    #[test]
    fn in_place_rendering_targets_the_input_directories() {
        let tree = sample_tree();
        let template = RenderParameters::new("unused");

        render_tree_with(&template, tree.path(), None, &mut |params| {
            assert_eq!(
                params.output_dir.as_deref(),
                params.input.parent()
            );
            Ok(())
        })
        .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn an_unreadable_directory_is_recorded_and_siblings_continue() {
        use std::os::unix::fs::PermissionsExt;

        let tree = sample_tree();
        let locked = tree.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Privileged test runs bypass the permission bits entirely.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let out = tempfile::tempdir().unwrap();
        let template = RenderParameters::new("unused");
        let report =
            render_tree_with(&template, tree.path(), Some(out.path()), &mut |_| Ok(()))
                .unwrap();

        // "locked" sorts before sub1/sub2; both were still traversed.
        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 5);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].0.ends_with("locked"));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn non_directory_input_is_rejected() {
        let tree = sample_tree();
        let template = RenderParameters::new("unused");
        let file = tree.path().join("a.es");
        assert!(matches!(
            render_tree_with(&template, &file, None, &mut |_| Ok(())),
            Err(CoreError::MissingInput(_))
        ));
    }
}
