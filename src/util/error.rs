//! Error types for the AnnData loader.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for staging and loading operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Source path cannot be staged (no file name, unknown scheme, ...)
    #[error("Invalid source path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Download or copy of a remote file failed
    #[error("Failed to stage '{source_path}': {message}")]
    Staging { source_path: String, message: String },

    /// Container file cannot be opened
    #[error("Cannot open container {path}: {message}")]
    Open { path: PathBuf, message: String },

    /// Required top-level sections are missing
    #[error("Missing fields: [{}]", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// Node not found by name
    #[error("'{name}' not found in group '{group}'")]
    NotFound { name: String, group: String },

    /// Encoding or element type not recognized
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Data violates an encoding invariant
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// Document handle was already released
    #[error("Document is closed")]
    Closed,

    /// Configuration could not be read
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a staging error.
    pub fn staging(source_path: impl Into<String>, message: impl ToString) -> Self {
        Self::Staging {
            source_path: source_path.into(),
            message: message.to_string(),
        }
    }

    /// Create an open error.
    pub fn open(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Open {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self::NotFound {
            name: name.into(),
            group: group.into(),
        }
    }

    /// Create an unsupported type error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedType(msg.into())
    }

    /// Create a corrupt data error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptData(msg.into())
    }
}

/// Result type alias for loader operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::Schema {
            missing: vec!["layers".into(), "uns".into()],
        };
        assert_eq!(e.to_string(), "Missing fields: [layers, uns]");

        let e = Error::not_found("cell_type", "obs");
        assert!(e.to_string().contains("cell_type"));
        assert!(e.to_string().contains("obs"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
