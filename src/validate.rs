//! Batch validation.
//!
//! Two stages, in this order:
//! 1. Pre-batch checks (multiple-file mode, max-files cap). A failure rejects
//!    the whole batch with a single error and nothing is accepted.
//! 2. Per-item checks (mime allow-list, size limit). Each invalid item yields
//!    one error; valid siblings are still accepted.
//!
//! Validation never fails as an operation: callers get a [`Validation`] with
//! the accepted items and the errors to route to the error channel.

use tracing::debug;

use crate::config::UploadConfig;
use crate::error::AddFileError;
use crate::file::{IngestedFile, RawFile, TrackedFile};

/// Anything that can be checked against the allow-list and size limit.
pub trait Candidate {
    fn name(&self) -> &str;
    fn mime_type(&self) -> &str;
    fn size(&self) -> u64;
}

impl Candidate for RawFile {
    fn name(&self) -> &str {
        &self.name
    }
    fn mime_type(&self) -> &str {
        &self.mime_type
    }
    fn size(&self) -> u64 {
        self.size
    }
}

impl Candidate for IngestedFile {
    fn name(&self) -> &str {
        &self.name
    }
    fn mime_type(&self) -> &str {
        &self.mime_type
    }
    fn size(&self) -> u64 {
        self.size
    }
}

impl Candidate for TrackedFile {
    fn name(&self) -> &str {
        &self.name
    }
    fn mime_type(&self) -> &str {
        &self.mime_type
    }
    fn size(&self) -> u64 {
        self.size
    }
}

/// Outcome of validating a batch.
#[derive(Debug)]
pub struct Validation<T> {
    pub valid: Vec<T>,
    pub errors: Vec<AddFileError>,
}

impl<T> Validation<T> {
    /// Nothing survived and at least one error was raised.
    pub fn is_rejected(&self) -> bool {
        self.valid.is_empty() && !self.errors.is_empty()
    }

    fn reject(error: AddFileError) -> Self {
        Self {
            valid: Vec::new(),
            errors: vec![error],
        }
    }
}

/// Runs the pre-batch checks, then the per-item checks.
///
/// `current_len` is the number of files already in the list.
pub fn validate_batch<T: Candidate>(
    config: &UploadConfig,
    current_len: usize,
    inputs: Vec<T>,
) -> Validation<T> {
    let batch_len = inputs.len();

    if !config.multiple && batch_len > 1 {
        debug!(batch_len, "Rejecting batch: multiple files not allowed");
        return Validation::reject(AddFileError::MultipleNotAllowed);
    }

    if let Some(max_files) = config.max_files.filter(|&m| m > 0) {
        if batch_len > max_files || batch_len + current_len > max_files {
            debug!(batch_len, current_len, max_files, "Rejecting batch: max files exceeded");
            return Validation::reject(AddFileError::MaxFilesNumber { max_files });
        }
    }

    validate_items(config, inputs)
}

/// Per-item checks only: mime allow-list, then size in decimal megabytes.
pub fn validate_items<T: Candidate>(config: &UploadConfig, inputs: Vec<T>) -> Validation<T> {
    let mut valid = Vec::with_capacity(inputs.len());
    let mut errors = Vec::new();

    for item in inputs {
        if !config.mime_types.iter().any(|m| m == item.mime_type()) {
            debug!(file = item.name(), mime_type = item.mime_type(), "Rejecting file: type not allowed");
            errors.push(AddFileError::InvalidFile {
                file_name: item.name().to_owned(),
                allowed: config.mime_types.join(","),
            });
        } else if item.size() as f64 * 1e-6 > config.max_file_size_mb {
            debug!(file = item.name(), size = item.size(), "Rejecting file: over size limit");
            errors.push(AddFileError::OverSizeLimit {
                file_name: item.name().to_owned(),
                max_file_size_mb: config.max_file_size_mb,
            });
        } else {
            valid.push(item);
        }
    }

    Validation { valid, errors }
}
