// SPDX-License-Identifier: MIT OR Apache-2.0

//! Categorical error kinds for the backup engine.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackupError>;

#[derive(Error, Debug)]
pub enum BackupError {
    /// A scan input is neither a file nor a directory.
    #[error("invalid input: '{path}' is not a file or directory")]
    InvalidInput { path: PathBuf },

    /// An unrecognized operation code was found in a manifest entry.
    #[error("invalid input: unrecognized manifest operation '{operation}' for '{path}'")]
    InvalidManifestOperation { path: String, operation: String },

    /// An include/exclude/traverse pattern failed to compile as a regex.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A manifest (historical or snapshot data.json) failed to parse,
    /// or a referenced blob is missing.
    #[error("corrupt manifest at '{path}': {reason}")]
    CorruptManifest { path: PathBuf, reason: String },

    /// `commit-offsite` was invoked with no prior `.pending` snapshot.
    #[error("no pending snapshot found for backup '{backup_name}'")]
    PendingMissing { backup_name: String },

    /// Underlying read/write/rename failure.
    #[error("I/O failure on '{path}': {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external archiver process exited with a non-zero status.
    #[error("archiver failed with exit code {code:?}")]
    ArchiverFailure { code: Option<i32> },
}

impl BackupError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackupError::IoFailure {
            path: path.into(),
            source,
        }
    }
}
