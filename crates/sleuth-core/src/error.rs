use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SleuthError {
    #[error("invalid bug file: {0}")]
    InvalidBugFile(String),

    #[error("bug[{index}].{field}: {reason}")]
    InvalidField {
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("invalid status transition from {from} to {to}: status never moves backward")]
    InvalidTransition { from: String, to: String },

    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("invalid findings report: {0}")]
    InvalidReport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SleuthError>;
