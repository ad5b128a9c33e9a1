use serde::{Deserialize, Serialize};

/// Manager-wide lifecycle value, distinct from any single file's [`crate::file::Stage`].
///
/// `Processing` covers both adding files and uploading them. `Retry` is the
/// processing state entered when an upload starts after a failed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    #[default]
    Idle,
    Processing,
    Retry,
    Error,
    Finished,
    Success,
}

impl BatchStatus {
    /// True while an add, delete-all or upload is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, BatchStatus::Processing | BatchStatus::Retry)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BatchStatus::Idle => "IDLE",
            BatchStatus::Processing => "PROCESSING",
            BatchStatus::Retry => "RETRY",
            BatchStatus::Error => "ERROR",
            BatchStatus::Finished => "FINISHED",
            BatchStatus::Success => "SUCCESS",
        };
        f.write_str(s)
    }
}
