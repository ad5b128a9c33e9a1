#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use upload_control::contract::{AddFileErrorSink, FinishListener};
use upload_control::file::IngestedFile;
use upload_control::{AddFileError, ErrorCode, RawFile, Stage, TrackedFile};

pub fn png(name: &str, size: usize) -> RawFile {
    RawFile::from_bytes(name, "image/png", vec![0u8; size])
}

pub fn pdf(name: &str, size: usize) -> RawFile {
    RawFile::from_bytes(name, "application/pdf", vec![0u8; size])
}

/// A list entry already in the given stage, for seeding a manager.
pub fn tracked(name: &str, stage: Stage) -> TrackedFile {
    let mut file = TrackedFile::new(IngestedFile::from_bytes(name, "image/png", vec![1u8; 16]), 0);
    file.upload_status.stage = stage;
    if stage == Stage::Finished {
        file.upload_status.progress = 100.0;
    }
    file
}

pub fn names(files: &[TrackedFile]) -> Vec<String> {
    files.iter().map(|f| f.name.clone()).collect()
}

pub fn assert_contiguous(files: &[TrackedFile]) {
    for (index, file) in files.iter().enumerate() {
        assert_eq!(
            file.order,
            index + 1,
            "order of {} should follow its position",
            file.name
        );
    }
}

/// Error sink that keeps everything it receives.
#[derive(Clone, Default)]
pub struct RecordingErrors(Arc<Mutex<Vec<AddFileError>>>);

impl RecordingErrors {
    pub fn all(&self) -> Vec<AddFileError> {
        self.0.lock().unwrap().clone()
    }

    pub fn codes(&self) -> Vec<Option<ErrorCode>> {
        self.all().iter().map(AddFileError::code).collect()
    }
}

impl AddFileErrorSink for RecordingErrors {
    fn on_add_file_error(&self, error: &AddFileError) {
        self.0.lock().unwrap().push(error.clone());
    }
}

/// Finish listener that keeps every list it was called with.
#[derive(Clone, Default)]
pub struct RecordingFinish(Arc<Mutex<Vec<Vec<TrackedFile>>>>);

impl RecordingFinish {
    pub fn calls(&self) -> Vec<Vec<TrackedFile>> {
        self.0.lock().unwrap().clone()
    }
}

impl FinishListener for RecordingFinish {
    fn on_finish(&self, files: &[TrackedFile]) {
        self.0.lock().unwrap().push(files.to_vec());
    }
}
