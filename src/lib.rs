//! upload-control: client-side upload state manager.
//!
//! Tracks a list of files through validation, optional pre-processing,
//! ordering, upload and completion, and exposes that state to a UI layer.
//! Transport, rendering and image codecs belong to the host application,
//! which plugs in through the traits in [`contract`].
//!
//! # Usage
//! Build an [`UploadManager`] from an [`UploadConfig`] and [`Handlers`], feed
//! it [`RawFile`]s with [`UploadManager::add_files`], then call
//! [`UploadManager::upload_all_files`].

pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod file;
pub mod load_config;
pub mod manager;
#[cfg(feature = "pdf")]
pub mod pdf_pages;
pub mod preprocess;
pub mod simulate;
pub mod status;
pub mod validate;

pub use config::UploadConfig;
pub use error::{AddFileError, ErrorCode, ManagerError, ProcessError};
pub use file::{FileId, IngestedFile, RawFile, Stage, TrackedFile, UploadStatus};
pub use manager::{Handlers, MoveDirection, ProgressReporter, UploadManager, UploadReport};
pub use preprocess::PreProcessors;
pub use status::BatchStatus;
