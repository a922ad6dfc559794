use std::process::ExitStatus;
use thiserror::Error;

/// Custom error types for esrender.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid duration '{0}': expected an integer or a timecode (12:34:56.789000)")]
    InvalidDuration(String),

    #[error("invalid output: {0}")]
    InvalidOutput(String),

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("{tool} exited with {status}: {stderr}")]
    ChildProcessFailure {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to start {tool}: {source}")]
    CommandStart {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("required tool '{0}' not found")]
    DependencyNotFound(String),

    #[error("invalid path: {0}")]
    PathError(String),

    #[error("render interrupted")]
    Interrupted,

    #[error("{0}")]
    Other(String),
}

/// Result type for esrender operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Builds a `ChildProcessFailure` from a tool name, its exit status, and
/// whatever stderr output was captured.
pub(crate) fn child_failed(tool: &str, status: ExitStatus, stderr: &str) -> CoreError {
    CoreError::ChildProcessFailure {
        tool: tool.to_string(),
        status,
        stderr: stderr.trim().to_string(),
    }
}

/// Builds a `CommandStart` error for a tool that could not be spawned.
pub(crate) fn start_failed(tool: &str, source: std::io::Error) -> CoreError {
    CoreError::CommandStart {
        tool: tool.to_string(),
        source,
    }
}
