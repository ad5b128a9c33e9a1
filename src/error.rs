//! Error types for the upload manager.
//!
//! Validation problems are *not* failures of an operation: they are built as
//! [`AddFileError`] values and routed to the error channel
//! ([`crate::contract::AddFileErrorSink`]). Only genuine operation failures
//! (missing upload host, unknown file id, host callback errors) come back as
//! [`ManagerError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::file::FileId;

/// Boxed error returned by host callbacks (upload, delete).
pub type HostError = Box<dyn std::error::Error + Send + Sync>;

/// Typed code attached to every validation rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Mime type is not on the allow-list.
    InvalidFile,
    /// File is larger than the configured limit.
    OverSizeLimit,
    /// More than one file offered while multiple-file mode is off.
    MultipleNotAllowed,
    /// The batch would push the list past the configured cap.
    MaxFilesNumber,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidFile => "INVALID_FILE",
            ErrorCode::OverSizeLimit => "OVER_SIZE_LIMIT",
            ErrorCode::MultipleNotAllowed => "MULTIPLE_NOT_ALLOWED",
            ErrorCode::MaxFilesNumber => "MAX_FILES_NUMBER",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that can be reported through the add-file error channel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AddFileError {
    #[error("File \"{file_name}\" has an unsupported type. Allowed types: {allowed}")]
    InvalidFile { file_name: String, allowed: String },

    #[error("File \"{file_name}\" exceeds the maximum file size of {max_file_size_mb} MB")]
    OverSizeLimit {
        file_name: String,
        max_file_size_mb: f64,
    },

    #[error("Only a single file can be added")]
    MultipleNotAllowed,

    #[error("No more than {max_files} files can be added")]
    MaxFilesNumber { max_files: usize },

    /// Untyped catch-all: pre-processing failure, read failure, host throw.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AddFileError {
    /// Typed code, or `None` for the untyped catch-all.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AddFileError::InvalidFile { .. } => Some(ErrorCode::InvalidFile),
            AddFileError::OverSizeLimit { .. } => Some(ErrorCode::OverSizeLimit),
            AddFileError::MultipleNotAllowed => Some(ErrorCode::MultipleNotAllowed),
            AddFileError::MaxFilesNumber { .. } => Some(ErrorCode::MaxFilesNumber),
            AddFileError::Unexpected(_) => None,
        }
    }

    /// Human-readable message, as shown to the user.
    pub fn text(&self) -> String {
        self.to_string()
    }
}

/// Failure raised by a pre-processor. Aborts the whole `add_files` batch.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("I/O error during pre-processing: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF pre-processing failed: {0}")]
    Pdf(String),

    #[error("{0}")]
    Other(String),
}

/// Failure of a manager operation.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("no upload handler configured")]
    NoUploader,

    #[error("file with id {0} not found")]
    FileNotFound(FileId),

    #[error("host callback failed: {0}")]
    Host(HostError),
}
