//! File records managed by the upload manager.
//!
//! A file goes through three shapes:
//! - [`RawFile`]: what the UI hands over (name, mime type, size, where the bytes live)
//! - [`IngestedFile`]: the bytes have been read, a data URI and preview derived.
//!   This is also the record pre-processors receive and return.
//! - [`TrackedFile`]: an ingested file that has been accepted into the list and
//!   carries its `order` and upload status.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Open key-value bag filled by pre-processing or by the host's upload result.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Opaque, session-unique file identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for FileId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Per-file lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    #[default]
    Idle,
    Uploading,
    Finished,
    Failed,
    /// Handed to the host's delete callback.
    Removing,
}

/// Error payload reported by the host for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadError {
    pub text: String,
    pub code: String,
}

impl UploadError {
    pub fn new(text: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: code.into(),
        }
    }
}

/// Upload state of one file: stage, progress in percent, optional error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UploadStatus {
    pub stage: Stage,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<UploadError>,
}

/// Preview for image-like files. Dimensions are present when the image header
/// could be decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewImage {
    #[serde(skip)]
    pub data_uri: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Where the bytes of a [`RawFile`] live.
#[derive(Debug, Clone)]
pub enum FileSource {
    Memory(Bytes),
    Path(PathBuf),
}

/// Candidate input as offered by the UI (drop, picker, camera, clipboard).
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub source: FileSource,
}

impl RawFile {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: content.len() as u64,
            source: FileSource::Memory(content),
        }
    }

    /// Reference a file on disk. Only metadata is read here; the content is
    /// read during ingestion.
    pub fn from_path(path: impl AsRef<Path>, mime_type: impl Into<String>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            mime_type: mime_type.into(),
            size,
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Read the full binary.
    pub async fn read(&self) -> std::io::Result<Bytes> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => tokio::fs::read(path).await.map(Bytes::from),
        }
    }
}

/// A file whose content has been read. Handed to and returned by pre-processors.
#[derive(Debug, Clone, Serialize)]
pub struct IngestedFile {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    #[serde(skip)]
    pub content: Bytes,
    #[serde(skip)]
    pub data_uri: String,
    pub preview: Option<PreviewImage>,
    pub metadata: Metadata,
}

impl IngestedFile {
    /// Build a record from bytes, deriving the data URI and, for image types,
    /// the preview.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        let mime_type = mime_type.into();
        let content = content.into();
        let data_uri = to_data_uri(&mime_type, &content);
        let preview = is_image(&mime_type).then(|| preview_image(&data_uri, &content));
        Self {
            id: FileId::new(),
            name: name.into(),
            size: content.len() as u64,
            mime_type,
            content,
            data_uri,
            preview,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A file accepted into the managed list.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedFile {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    #[serde(skip)]
    pub content: Bytes,
    #[serde(skip)]
    pub data_uri: String,
    pub preview: Option<PreviewImage>,
    /// 1-based, always `index + 1` within the list.
    pub order: usize,
    pub upload_status: UploadStatus,
    pub metadata: Metadata,
}

impl TrackedFile {
    pub fn new(file: IngestedFile, order: usize) -> Self {
        Self {
            id: file.id,
            name: file.name,
            size: file.size,
            mime_type: file.mime_type,
            content: file.content,
            data_uri: file.data_uri,
            preview: file.preview,
            order,
            upload_status: UploadStatus::default(),
            metadata: file.metadata,
        }
    }

    pub fn stage(&self) -> Stage {
        self.upload_status.stage
    }

    pub fn is_finished(&self) -> bool {
        self.stage() == Stage::Finished
    }
}

pub(crate) fn is_image(mime_type: &str) -> bool {
    mime_type.contains("image")
}

fn to_data_uri(mime_type: &str, content: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(content))
}

fn preview_image(data_uri: &str, content: &[u8]) -> PreviewImage {
    let dimensions = image::ImageReader::new(Cursor::new(content))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());
    PreviewImage {
        data_uri: data_uri.to_owned(),
        width: dimensions.map(|(w, _)| w),
        height: dimensions.map(|(_, h)| h),
    }
}
