//! # contract: host callbacks invoked by the upload manager
//!
//! The manager never talks to a network or a UI itself. Everything outside
//! its state machine is reached through the traits in this module:
//! - [`Uploader`]: performs the upload and reports progress (required for uploads)
//! - [`Deleter`]: cleanup notification for removed files (optional)
//! - [`FinishListener`]: called once a batch is fully reconciled as successful
//! - [`AddFileErrorSink`]: receives validation and ingestion errors
//! - [`PreProcess`]: a type-keyed transform applied before files are accepted
//!
//! ## Mocking & Testing
//! - Traits are annotated for `mockall`; the generated mocks are exported
//!   under the default `test-export-mocks` feature for integration tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{AddFileError, HostError, ProcessError};
use crate::file::{FileId, IngestedFile, Metadata, TrackedFile};
use crate::manager::ProgressReporter;

pub use crate::file::UploadError;

/// Per-file outcome returned by the host's upload (or delete) callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub file_id: FileId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<UploadError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl UploadResult {
    pub fn success(file_id: FileId) -> Self {
        Self {
            file_id,
            success: true,
            error: None,
            metadata: None,
        }
    }

    pub fn failure(file_id: FileId, error: UploadError) -> Self {
        Self {
            file_id,
            success: false,
            error: Some(error),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Uploads the submitted files, reporting per-file progress through `progress`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        files: Vec<TrackedFile>,
        progress: ProgressReporter,
    ) -> Result<Vec<UploadResult>, HostError>;
}

/// Cleanup notification for files leaving the list.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Deleter: Send + Sync {
    async fn delete(&self, files: Vec<TrackedFile>) -> Result<Vec<UploadResult>, HostError>;
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait FinishListener: Send + Sync {
    /// Receives the fully reconciled list of a successful batch.
    fn on_finish(&self, files: &[TrackedFile]);
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait AddFileErrorSink: Send + Sync {
    fn on_add_file_error(&self, error: &AddFileError);
}

/// Transforms one ingested file into zero or more replacement files.
///
/// - `Ok(None)`: nothing usable; the original record is kept.
/// - `Ok(Some(files))`: replace the original with `files` (may be empty).
/// - `Err(_)`: aborts the whole `add_files` batch.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PreProcess: Send + Sync {
    async fn process(&self, file: IngestedFile) -> Result<Option<Vec<IngestedFile>>, ProcessError>;
}

/// Default error channel when the host supplies none: logs the error.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl AddFileErrorSink for LogNotifier {
    fn on_add_file_error(&self, error: &AddFileError) {
        match error.code() {
            Some(code) => warn!(code = %code, "{}", error),
            None => warn!("{}", error),
        }
    }
}
