//! Error taxonomy for forensic workflow failures.
//!
//! Every failure mode a stage can hit has a distinct variant, so the workflow
//! can decide whether to halt, and the audit trail records a precise reason.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SkatError>;

#[derive(Error, Debug)]
pub enum SkatError {
    /// A required external tool could not be resolved to an executable.
    #[error("required tool not found: {0}")]
    ToolNotFound(String),

    /// A tool ran but exited non-zero.
    #[error("{tool} exited with status {status}: {stderr}")]
    ToolExecutionFailure {
        tool: String,
        status: i32,
        stderr: String,
    },

    /// A tool exceeded the configured timeout and was terminated.
    #[error("{tool} terminated after exceeding the {seconds}s timeout")]
    Timeout { tool: String, seconds: u64 },

    /// Recomputed digests no longer match the stored integrity record.
    #[error("integrity violation for {image}: {detail}")]
    IntegrityViolation { image: PathBuf, detail: String },

    /// An evidence artifact (image, sidecar, report) already exists and must
    /// not be overwritten.
    #[error("refusing to overwrite existing file: {0}")]
    AlreadyExists(PathBuf),

    /// An operation was given arguments it cannot act on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
