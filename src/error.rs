//! Error types for message conversion

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while converting messages
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The source message could not be opened or parsed at all
    #[error("Failed to open message {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    /// Reading or writing a file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the tabular output failed
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The rendering engine could not be started or reported failure
    #[error("Renderer `{program}` failed: {details}")]
    Render { program: String, details: String },

    /// An isolated child conversion exited unsuccessfully
    #[error("Isolated conversion of {} exited with {status}", path.display())]
    Isolated { path: PathBuf, status: String },

    /// The input path is neither a .msg file nor a directory
    #[error("Not a .msg file or directory: {}", .0.display())]
    InvalidInput(PathBuf),
}

impl ConvertError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;
