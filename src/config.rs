use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Image types accepted when no allow-list is configured.
pub const DEFAULT_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/webp",
    "image/bmp",
];

/// Configuration of one upload widget, fixed at manager construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Allow-list of mime types.
    pub mime_types: Vec<String>,
    /// Whether more than one file may be offered at once.
    pub multiple: bool,
    /// Size limit in decimal megabytes (`bytes * 1e-6`).
    pub max_file_size_mb: f64,
    /// Cap on the number of files in the list. `None` and `Some(0)` both
    /// mean no cap.
    pub max_files: Option<usize>,
    /// Clear the list once a batch has been uploaded and `on_finish` has run.
    pub reset_on_finish: bool,
    pub disable_sorting: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            mime_types: DEFAULT_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
            multiple: true,
            max_file_size_mb: 10.0,
            max_files: None,
            reset_on_finish: false,
            disable_sorting: false,
        }
    }
}

impl UploadConfig {
    pub fn trace_loaded(&self) {
        info!(
            mime_types = self.mime_types.len(),
            multiple = self.multiple,
            max_file_size_mb = self.max_file_size_mb,
            max_files = ?self.max_files,
            "Loaded UploadConfig"
        );
        debug!(?self, "UploadConfig loaded (full debug)");
    }
}
