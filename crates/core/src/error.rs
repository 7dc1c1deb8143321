use serde::Serialize;
use thiserror::Error;

/// Errors that stop a run before any note is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration found (looked in {0})")]
    Missing(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("vault unavailable: {0}")]
    Vault(String),
}

/// Per-note failures. These are carried inside a note's outcome and never
/// interrupt a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoteError {
    #[error("could not read tags of {path}: {reason}")]
    TagRead { path: String, reason: String },
    #[error("note {path} not found")]
    NoteNotFound { path: String },
    #[error("{path} is a folder, not a note")]
    NotANote { path: String },
    #[error("destination folder {path} does not exist")]
    MissingFolder { path: String },
    #[error("{path} is a file, not a folder")]
    NotAFolder { path: String },
    #[error("{path} already exists")]
    Collision { path: String },
    #[error("permission denied on {path}")]
    PermissionDenied { path: String },
    #[error("invalid vault path {path}")]
    InvalidPath { path: String },
    #[error("i/o error on {path}: {reason}")]
    Io { path: String, reason: String },
}

impl NoteError {
    /// Maps an I/O error raised while operating on `path`.
    pub fn from_io(path: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => NoteError::NoteNotFound {
                path: path.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => NoteError::PermissionDenied {
                path: path.to_string(),
            },
            std::io::ErrorKind::AlreadyExists => NoteError::Collision {
                path: path.to_string(),
            },
            _ => NoteError::Io {
                path: path.to_string(),
                reason: err.to_string(),
            },
        }
    }
}
