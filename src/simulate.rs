//! A host [`Uploader`] that pretends to upload.
//!
//! Reports stepped progress for every file concurrently, then succeeds, or
//! fails for files whose name was registered with
//! [`SimulatedUploader::fail_file`]. Used by the CLI and handy in tests.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use tracing::debug;

use crate::contract::{UploadResult, Uploader};
use crate::error::HostError;
use crate::file::{Metadata, TrackedFile, UploadError};
use crate::manager::ProgressReporter;

pub const SIMULATED_ERROR_CODE: &str = "UPLOAD_ERROR";

#[derive(Debug, Clone)]
pub struct SimulatedUploader {
    step: f64,
    delay: Duration,
    failing: HashSet<String>,
}

impl Default for SimulatedUploader {
    fn default() -> Self {
        Self {
            step: 25.0,
            delay: Duration::ZERO,
            failing: HashSet::new(),
        }
    }
}

impl SimulatedUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress increment per tick, in percent. Clamped to `1..=100`.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step.clamp(1.0, 100.0);
        self
    }

    /// Pause between progress ticks.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make uploads of the file with this name fail.
    pub fn fail_file(mut self, name: impl Into<String>) -> Self {
        self.failing.insert(name.into());
        self
    }
}

#[async_trait]
impl Uploader for SimulatedUploader {
    async fn upload(
        &self,
        files: Vec<TrackedFile>,
        progress: ProgressReporter,
    ) -> Result<Vec<UploadResult>, HostError> {
        let uploads = files.into_iter().map(|file| {
            let progress = progress.clone();
            let fails = self.failing.contains(&file.name);
            let step = self.step;
            let delay = self.delay;
            async move {
                let mut percent = 0.0;
                while percent < 100.0 {
                    progress.report(&file.id, percent, None);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    percent += step;
                }

                if fails {
                    let error = UploadError::new(
                        format!("Upload of {} failed", file.name),
                        SIMULATED_ERROR_CODE,
                    );
                    progress.report(&file.id, 100.0, Some(error.clone()));
                    debug!(file = %file.name, "Simulated upload failed");
                    return UploadResult::failure(file.id, error);
                }

                progress.report(&file.id, 100.0, None);
                let mut metadata = Metadata::new();
                metadata.insert("uploadedBytes".to_string(), Value::from(file.size));
                debug!(file = %file.name, "Simulated upload finished");
                UploadResult::success(file.id).with_metadata(metadata)
            }
        });

        Ok(join_all(uploads).await)
    }
}
