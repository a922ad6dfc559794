//! Frame-dimension query.
//!
//! A short-lived invocation of the `size` helper, which prints
//! `<width>x<height>` for an event stream. The dimensions are fixed for the
//! whole recording, so one query per render suffices.

use crate::config::RenderParameters;
use crate::error::{child_failed, CoreError, CoreResult};
use std::process::{Command, Stdio};

/// Queries the sensor dimensions of the input and applies the requested
/// scale factor.
pub fn query_dimensions(params: &RenderParameters) -> CoreResult<(u32, u32)> {
    let tool = super::tool_name(&params.tools.size);
    let mut cmd = Command::new(&params.tools.size);
    cmd.arg(&params.input)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let child = super::spawn_tool(&mut cmd, &tool)?;
    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(child_failed(
            &tool,
            output.status,
            &String::from_utf8_lossy(&output.stderr),
        ));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let (width, height) = parse_dimensions(text.trim()).ok_or_else(|| {
        CoreError::Other(format!(
            "unexpected output from {tool}: expected '<width>x<height>', got '{}'",
            text.trim()
        ))
    })?;
    log::debug!(
        "{} is {width}x{height} (scale {})",
        params.input.display(),
        params.scale
    );
    apply_scale(width, height, params.scale).ok_or_else(|| {
        CoreError::Other(format!(
            "{width}x{height} at scale {} exceeds the representable frame dimensions",
            params.scale
        ))
    })
}

fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let (width, height) = text.split_once('x')?;
    Some((width.trim().parse().ok()?, height.trim().parse().ok()?))
}

fn apply_scale(width: u32, height: u32, scale: u32) -> Option<(u32, u32)> {
    Some((width.checked_mul(scale)?, height.checked_mul(scale)?))
}

#[cfg(test)]
mod tests {
    use super::{apply_scale, parse_dimensions};

    #[test]
    fn parses_width_and_height() {
        assert_eq!(parse_dimensions("1280x720"), Some((1280, 720)));
        assert_eq!(parse_dimensions("304x240"), Some((304, 240)));
    }

    #[test]
    fn rejects_malformed_dimension_strings() {
        assert_eq!(parse_dimensions(""), None);
        assert_eq!(parse_dimensions("1280"), None);
        assert_eq!(parse_dimensions("1280x"), None);
        assert_eq!(parse_dimensions("axb"), None);
        assert_eq!(parse_dimensions("1280x720x3"), None);
    }

    #[test]
    fn scaling_is_checked_for_overflow() {
        assert_eq!(apply_scale(304, 240, 4), Some((1216, 960)));
        assert_eq!(apply_scale(304, 240, u32::MAX), None);
        assert_eq!(apply_scale(u32::MAX, 1, 2), None);
    }
}
