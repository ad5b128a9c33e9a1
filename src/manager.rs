//! Upload state manager.
//!
//! One [`UploadManager`] per upload widget. It owns the list of
//! [`TrackedFile`]s and the [`BatchStatus`], and is the only place either is
//! mutated. The state lives in a `tokio::sync::watch` channel: every mutation
//! is a single `send_modify`/`send_if_modified` against the latest snapshot,
//! so interleaved async operations never observe a torn list, and UI
//! subscribers are woken after each commit.
//!
//! # Lifecycle
//! - [`UploadManager::add_files`]: validate → read → pre-process → re-validate → append
//! - [`UploadManager::upload_all_files`]: submit non-finished files to the host
//!   [`Uploader`], track progress, reconcile results, run the finish sequence
//! - [`UploadManager::delete_file`] / [`UploadManager::delete_all_files`] /
//!   [`UploadManager::reset`]: shrink or clear the list
//!
//! # Error Handling
//! Validation and ingestion problems go to the [`AddFileErrorSink`] and never
//! abort a call. Operation failures return [`ManagerError`]. No path leaves
//! the status in `PROCESSING`.
//!
//! Two concurrent `upload_all_files` calls are not excluded here; callers
//! disable their trigger while [`UploadManager::is_processing`] holds.

use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::UploadConfig;
use crate::contract::{
    AddFileErrorSink, Deleter, FinishListener, LogNotifier, PreProcess, Uploader,
};
use crate::error::{AddFileError, ManagerError};
use crate::file::{FileId, IngestedFile, RawFile, Stage, TrackedFile, UploadError, UploadStatus};
use crate::preprocess::PreProcessors;
use crate::status::BatchStatus;
use crate::validate::{validate_batch, validate_items, Candidate, Validation};

/// Snapshot of the manager's state, as seen by subscribers.
#[derive(Debug, Clone, Default)]
pub struct UploadState {
    files: Vec<TrackedFile>,
    status: BatchStatus,
}

impl UploadState {
    pub fn files(&self) -> &[TrackedFile] {
        &self.files
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }
}

/// Host callbacks and pre-processors for one manager.
#[derive(Clone, Default)]
pub struct Handlers {
    pub uploader: Option<Arc<dyn Uploader>>,
    pub deleter: Option<Arc<dyn Deleter>>,
    pub finish: Option<Arc<dyn FinishListener>>,
    pub add_file_error: Option<Arc<dyn AddFileErrorSink>>,
    pub pre_processors: Option<PreProcessors>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uploader(mut self, uploader: impl Uploader + 'static) -> Self {
        self.uploader = Some(Arc::new(uploader));
        self
    }

    pub fn with_deleter(mut self, deleter: impl Deleter + 'static) -> Self {
        self.deleter = Some(Arc::new(deleter));
        self
    }

    pub fn on_finish(mut self, listener: impl FinishListener + 'static) -> Self {
        self.finish = Some(Arc::new(listener));
        self
    }

    pub fn on_add_file_error(mut self, sink: impl AddFileErrorSink + 'static) -> Self {
        self.add_file_error = Some(Arc::new(sink));
        self
    }

    pub fn with_pre_processors(mut self, pre_processors: PreProcessors) -> Self {
        self.pre_processors = Some(pre_processors);
        self
    }

    /// Shorthand for a single-type pre-processor.
    pub fn pre_process(
        mut self,
        mime_type: impl Into<String>,
        handler: impl PreProcess + 'static,
    ) -> Self {
        let map = self.pre_processors.take().unwrap_or_default();
        self.pre_processors = Some(map.register(mime_type, handler));
        self
    }
}

/// Progress sink handed to the [`Uploader`], keyed by file id.
#[derive(Clone)]
pub struct ProgressReporter {
    state: Arc<watch::Sender<UploadState>>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter").finish_non_exhaustive()
    }
}

impl ProgressReporter {
    /// Record progress for one file.
    ///
    /// Values outside `0..=100` are ignored. An error marks the file
    /// `FAILED`, 100 marks it `FINISHED`, anything else `UPLOADING`.
    /// A finished file only changes when an error is reported for it.
    pub fn report(&self, file_id: &FileId, progress: f64, error: Option<UploadError>) {
        if !(0.0..=100.0).contains(&progress) {
            debug!(file_id = %file_id, progress, "Ignoring out-of-range progress");
            return;
        }

        self.state.send_if_modified(|state| {
            let Some(file) = state.files.iter_mut().find(|f| &f.id == file_id) else {
                return false;
            };
            if file.is_finished() && error.is_none() {
                return false;
            }
            let stage = if error.is_some() {
                Stage::Failed
            } else if progress >= 100.0 {
                Stage::Finished
            } else {
                Stage::Uploading
            };
            file.upload_status = UploadStatus {
                stage,
                progress,
                error,
            };
            true
        });
    }
}

/// Which files an upload call submitted and how they ended.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UploadReport {
    pub submitted: Vec<FileId>,
    pub succeeded: Vec<FileId>,
    pub failed: Vec<FileId>,
}

impl UploadReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Accepted types (mime subtypes) and the size limit, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationInfo {
    pub types: Vec<String>,
    pub max_file_size_mb: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

pub struct UploadManager {
    config: UploadConfig,
    handlers: Handlers,
    state: Arc<watch::Sender<UploadState>>,
}

impl UploadManager {
    pub fn new(config: UploadConfig, handlers: Handlers) -> Self {
        let (state, _) = watch::channel(UploadState::default());
        Self {
            config,
            handlers,
            state: Arc::new(state),
        }
    }

    /// Seed the list with already-known files. Orders are renumbered to `1..N`.
    pub fn with_files(self, files: Vec<TrackedFile>) -> Self {
        self.state.send_modify(|state| {
            state.files = files;
            renumber(&mut state.files);
        });
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Receiver woken after every committed mutation.
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    pub fn files(&self) -> Vec<TrackedFile> {
        self.state.borrow().files.clone()
    }

    pub fn status(&self) -> BatchStatus {
        self.state.borrow().status
    }

    pub fn get_file(&self, id: &FileId) -> Option<TrackedFile> {
        self.state.borrow().files.iter().find(|f| &f.id == id).cloned()
    }

    pub fn status_is(&self, statuses: &[BatchStatus]) -> bool {
        statuses.contains(&self.status())
    }

    pub fn status_isnt(&self, statuses: &[BatchStatus]) -> bool {
        !self.status_is(statuses)
    }

    pub fn is_idle(&self) -> bool {
        self.status() == BatchStatus::Idle
    }

    pub fn is_processing(&self) -> bool {
        self.status().is_busy()
    }

    pub fn is_finished(&self) -> bool {
        self.status() == BatchStatus::Finished
    }

    pub fn is_error(&self) -> bool {
        self.status() == BatchStatus::Error
    }

    pub fn disable_sorting(&self) -> bool {
        self.config.disable_sorting
    }

    pub fn validation_info(&self) -> ValidationInfo {
        ValidationInfo {
            types: self
                .config
                .mime_types
                .iter()
                .map(|t| t.split_once('/').map_or(t.as_str(), |(_, sub)| sub).to_string())
                .collect(),
            max_file_size_mb: self.config.max_file_size_mb,
        }
    }

    /// Validate a candidate batch against the config and the current list
    /// size. Every error is routed to the error channel.
    pub fn validate_files<T: Candidate>(&self, inputs: Vec<T>) -> Validation<T> {
        let current_len = self.state.borrow().files.len();
        let validation = validate_batch(&self.config, current_len, inputs);
        self.report_errors(&validation.errors);
        validation
    }

    /// Validate, read, pre-process and append a batch of files.
    ///
    /// The batch is appended as a whole or not at all. Returns the ids of the
    /// accepted files; rejections and failures are reported through the
    /// error channel. The status is `IDLE` afterwards in every case.
    pub async fn add_files(&self, inputs: Vec<RawFile>) -> Vec<FileId> {
        info!(count = inputs.len(), "Adding files");
        self.set_status(BatchStatus::Processing);

        let accepted = match self.ingest(inputs).await {
            Ok(files) => files,
            Err(e) => {
                error!(error = %e, "Adding files failed");
                self.error_sink().on_add_file_error(&e);
                Vec::new()
            }
        };
        let ids: Vec<FileId> = accepted.iter().map(|f| f.id.clone()).collect();

        self.state.send_modify(|state| {
            let base = state.files.len();
            state.files.extend(
                accepted
                    .into_iter()
                    .enumerate()
                    .map(|(i, file)| TrackedFile::new(file, base + i + 1)),
            );
            state.status = BatchStatus::Idle;
        });

        info!(accepted = ids.len(), "Finished adding files");
        ids
    }

    async fn ingest(&self, inputs: Vec<RawFile>) -> Result<Vec<IngestedFile>, AddFileError> {
        let validation = self.validate_files(inputs);
        if validation.valid.is_empty() {
            return Ok(Vec::new());
        }

        let reads = validation.valid.into_iter().map(|raw| async move {
            let content = raw.read().await.map_err(|e| {
                AddFileError::Unexpected(format!("failed to read {}: {}", raw.name, e))
            })?;
            Ok::<_, AddFileError>(IngestedFile::from_bytes(raw.name, raw.mime_type, content))
        });
        let ingested = try_join_all(reads).await?;

        let Some(pre_processors) = &self.handlers.pre_processors else {
            return Ok(ingested);
        };
        let processed = pre_processors
            .run(ingested)
            .await
            .map_err(|e| AddFileError::Unexpected(e.to_string()))?;

        let validation = validate_items(&self.config, processed);
        self.report_errors(&validation.errors);
        Ok(validation.valid)
    }

    /// Move the file at `from` to `to`, renumbering the whole list.
    ///
    /// No-op when sorting is disabled, the status is not `IDLE`, an index is
    /// out of bounds, or a finished file sits anywhere in the moved range.
    /// Returns whether the list changed.
    pub fn move_file(&self, from: usize, to: usize) -> bool {
        if self.config.disable_sorting {
            return false;
        }

        self.state.send_if_modified(|state| {
            if state.status != BatchStatus::Idle {
                debug!(status = %state.status, "Reorder ignored while not idle");
                return false;
            }
            let len = state.files.len();
            if from >= len || to >= len || from == to {
                return false;
            }
            let (lo, hi) = (from.min(to), from.max(to));
            if state.files[lo..=hi].iter().any(TrackedFile::is_finished) {
                debug!(from, to, "Reorder ignored: finished files are pinned");
                return false;
            }
            let file = state.files.remove(from);
            state.files.insert(to, file);
            renumber(&mut state.files);
            true
        })
    }

    /// Move a file one position up or down.
    pub fn move_file_by_id(&self, id: &FileId, direction: MoveDirection) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let target = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => Some(index + 1),
        };
        target.is_some_and(|to| self.move_file(index, to))
    }

    /// Whether the UI should allow dragging this file right now.
    pub fn can_move(&self, id: &FileId) -> bool {
        let state = self.state.borrow();
        !self.config.disable_sorting
            && state.status == BatchStatus::Idle
            && state
                .files
                .iter()
                .any(|f| &f.id == id && !f.is_finished())
    }

    /// Remove one file that has not finished uploading.
    ///
    /// Finished files are refused silently. When the remaining files are all
    /// finished the status becomes `SUCCESS` and the finish listener runs.
    pub async fn delete_file(&self, id: &FileId) -> Result<(), ManagerError> {
        let mut found = false;
        let mut removed: Option<(TrackedFile, Option<Vec<TrackedFile>>)> = None;

        self.state.send_if_modified(|state| {
            let Some(index) = state.files.iter().position(|f| &f.id == id) else {
                return false;
            };
            found = true;
            if state.files[index].is_finished() {
                debug!(file_id = %id, "Refusing to delete finished file");
                return false;
            }

            let was_busy = state.status.is_busy();
            let file = state.files.remove(index);
            renumber(&mut state.files);

            let all_finished = !state.files.is_empty()
                && !was_busy
                && state.files.iter().all(TrackedFile::is_finished);
            if state.files.is_empty() {
                state.status = BatchStatus::Idle;
            } else if all_finished {
                state.status = BatchStatus::Success;
            }
            removed = Some((file, all_finished.then(|| state.files.clone())));
            true
        });

        if !found {
            return Err(ManagerError::FileNotFound(id.clone()));
        }
        let Some((mut file, finished)) = removed else {
            return Ok(());
        };
        info!(file_id = %id, file = %file.name, "Deleted file");

        if let Some(deleter) = &self.handlers.deleter {
            file.upload_status.stage = Stage::Removing;
            if let Err(e) = deleter.delete(vec![file]).await {
                warn!(file_id = %id, error = %e, "Delete callback failed");
            }
        }

        if let Some(files) = finished {
            self.notify_finish(&files);
            if self.config.reset_on_finish {
                self.reset();
            }
        }
        Ok(())
    }

    /// Clear the list, passing finished files to the delete callback first.
    ///
    /// If the callback fails the list is kept and the status becomes `ERROR`.
    pub async fn delete_all_files(&self) -> Result<(), ManagerError> {
        self.set_status(BatchStatus::Processing);

        let finished: Vec<TrackedFile> = self
            .state
            .borrow()
            .files
            .iter()
            .filter(|f| f.is_finished())
            .cloned()
            .map(|mut f| {
                f.upload_status.stage = Stage::Removing;
                f
            })
            .collect();

        if let Some(deleter) = &self.handlers.deleter {
            if !finished.is_empty() {
                if let Err(e) = deleter.delete(finished).await {
                    error!(error = %e, "Delete callback failed, keeping files");
                    self.set_status(BatchStatus::Error);
                    return Err(ManagerError::Host(e));
                }
            }
        }

        self.state.send_modify(|state| {
            state.files.clear();
            state.status = BatchStatus::Idle;
        });
        info!("Deleted all files");
        Ok(())
    }

    /// Upload every file that has not finished yet.
    ///
    /// Partial success is kept: succeeded files become `FINISHED`, failed
    /// ones `FAILED`, and the status `ERROR`. Calling again re-submits only
    /// the unfinished files. When everything succeeded the finish sequence
    /// runs.
    pub async fn upload_all_files(&self) -> Result<UploadReport, ManagerError> {
        let Some(uploader) = self.handlers.uploader.clone() else {
            error!("upload_all_files called without an upload handler");
            return Err(ManagerError::NoUploader);
        };

        let mut pending: Vec<TrackedFile> = Vec::new();
        self.state.send_modify(|state| {
            state.status = if state.status == BatchStatus::Error {
                BatchStatus::Retry
            } else {
                BatchStatus::Processing
            };
            pending = state
                .files
                .iter()
                .filter(|f| !f.is_finished())
                .cloned()
                .collect();
        });

        let mut report = UploadReport {
            submitted: pending.iter().map(|f| f.id.clone()).collect(),
            ..Default::default()
        };
        info!(count = pending.len(), "Uploading files");

        let progress = ProgressReporter {
            state: Arc::clone(&self.state),
        };
        let results = match uploader.upload(pending, progress).await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "Upload callback failed");
                self.set_status(BatchStatus::Error);
                return Err(ManagerError::Host(e));
            }
        };

        let mut snapshot = Vec::new();
        self.state.send_modify(|state| {
            for result in results {
                let Some(file) = state.files.iter_mut().find(|f| f.id == result.file_id) else {
                    warn!(file_id = %result.file_id, "Upload result for unknown file");
                    continue;
                };
                if result.success {
                    file.upload_status = UploadStatus {
                        stage: Stage::Finished,
                        progress: 100.0,
                        error: None,
                    };
                    report.succeeded.push(file.id.clone());
                } else {
                    // Files finished before this call were not submitted.
                    if !report.submitted.contains(&file.id) {
                        continue;
                    }
                    file.upload_status = UploadStatus {
                        stage: Stage::Failed,
                        progress: 100.0,
                        error: result.error,
                    };
                    report.failed.push(file.id.clone());
                }
                if let Some(metadata) = result.metadata {
                    file.metadata.extend(metadata);
                }
            }
            state.status = if report.failed.is_empty() {
                BatchStatus::Idle
            } else {
                BatchStatus::Error
            };
            snapshot = state.files.clone();
        });

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Upload reconciled"
        );
        if report.is_success() {
            self.finish(&snapshot);
        }
        Ok(report)
    }

    /// Clear the list and return to `IDLE`, regardless of in-flight work.
    pub fn reset(&self) {
        self.state.send_modify(|state| {
            state.files.clear();
            state.status = BatchStatus::Idle;
        });
        debug!("Upload control reset");
    }

    fn finish(&self, files: &[TrackedFile]) {
        self.notify_finish(files);
        if self.config.reset_on_finish {
            self.reset();
        } else {
            self.set_status(BatchStatus::Finished);
        }
    }

    fn notify_finish(&self, files: &[TrackedFile]) {
        if let Some(listener) = &self.handlers.finish {
            listener.on_finish(files);
        }
    }

    fn set_status(&self, status: BatchStatus) {
        self.state.send_if_modified(|state| {
            if state.status == status {
                return false;
            }
            state.status = status;
            true
        });
    }

    fn index_of(&self, id: &FileId) -> Option<usize> {
        self.state.borrow().files.iter().position(|f| &f.id == id)
    }

    fn error_sink(&self) -> &dyn AddFileErrorSink {
        self.handlers.add_file_error.as_deref().unwrap_or(&LogNotifier)
    }

    fn report_errors(&self, errors: &[AddFileError]) {
        let sink = self.error_sink();
        for error in errors {
            sink.on_add_file_error(error);
        }
    }
}

fn renumber(files: &mut [TrackedFile]) {
    for (index, file) in files.iter_mut().enumerate() {
        file.order = index + 1;
    }
}
