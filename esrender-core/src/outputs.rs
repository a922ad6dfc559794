//! Output path derivation.
//!
//! When the user does not supply an explicit output, the final artifact name
//! is derived from the input name plus every non-default parameter that
//! affects the rendered content, so two renders of the same recording with
//! different settings can never collide.

use crate::config::RenderParameters;
use crate::error::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// The final artifact paths for one render.
///
/// Exactly one of `video` / `audio` / `image` is the primary artifact;
/// `audio` can additionally be present as a companion to `video` when
/// sonification is requested without merging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputPlan {
    pub video: Option<PathBuf>,
    pub audio: Option<PathBuf>,
    pub image: Option<PathBuf>,
}

impl OutputPlan {
    /// The artifact the user primarily asked for.
    #[must_use]
    pub fn primary(&self) -> &Path {
        self.video
            .as_deref()
            .or(self.image.as_deref())
            .or(self.audio.as_deref())
            .expect("an output plan always has a primary artifact")
    }
}

/// Computes the final output paths for `params`.
///
/// Fails with `InvalidOutput` if any resolved output coincides with the
/// resolved input.
pub fn plan_outputs(params: &RenderParameters) -> CoreResult<OutputPlan> {
    let plan = if params.image {
        OutputPlan {
            image: Some(primary_path(params, "png")?),
            ..OutputPlan::default()
        }
    } else if params.sound_only {
        OutputPlan {
            audio: Some(primary_path(params, "wav")?),
            ..OutputPlan::default()
        }
    } else {
        let video = primary_path(params, "mp4")?;
        // An unmerged sound track sits next to the video, differing only in
        // extension.
        let audio = (params.sonify && !params.merge).then(|| video.with_extension("wav"));
        OutputPlan {
            video: Some(video),
            audio,
            image: None,
        }
    };

    for output in [&plan.video, &plan.audio, &plan.image].into_iter().flatten() {
        if same_path(output, &params.input)? {
            return Err(CoreError::InvalidOutput(format!(
                "input and output must be different files ({})",
                output.display()
            )));
        }
    }
    Ok(plan)
}

/// The primary artifact path: the explicit output verbatim when given,
/// otherwise the derived name with `extension` in the target directory.
fn primary_path(params: &RenderParameters, extension: &str) -> CoreResult<PathBuf> {
    if let Some(output) = &params.output {
        return Ok(output.clone());
    }
    let dir = match &params.output_dir {
        Some(dir) => dir.clone(),
        None => params
            .input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    Ok(dir.join(format!("{}.{extension}", derived_stem(params))))
}

/// The derived base name: input stem plus the non-default parameters that
/// shape the output.
fn derived_stem(params: &RenderParameters) -> String {
    let stem = params
        .input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut range = String::new();
    if params.begin.as_u64() > 0 || params.end.is_some() {
        range.push_str(&format!("_begin={}", params.begin));
    }
    if let Some(end) = params.end {
        range.push_str(&format!("_end={end}"));
    }

    let sound = if params.wants_audio() { "_sound" } else { "" };
    format!(
        "{stem}{range}_{}_frametime={}_tau={}{sound}",
        params.style.as_str(),
        params.frametime.compact(),
        params.tau.compact(),
    )
}

/// Compares two paths after making both absolute, without requiring either
/// to exist.
fn same_path(a: &Path, b: &Path) -> CoreResult<bool> {
    Ok(std::path::absolute(a)? == std::path::absolute(b)?)
}
