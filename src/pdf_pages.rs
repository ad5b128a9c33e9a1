//! PDF page splitting pre-processor.
//!
//! Expands one PDF into one single-page PDF per page so every page becomes its
//! own entry in the file list. Rasterising pages is left to the host.

use std::path::Path;

use async_trait::async_trait;
use lopdf::{Document, Object};
use serde_json::Value;
use tracing::{debug, info};

use crate::contract::PreProcess;
use crate::error::ProcessError;
use crate::file::{IngestedFile, Metadata};

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Splits a PDF into single-page PDFs named `<stem>_page<N>.pdf`.
///
/// Every page carries `pageNumber` metadata, plus `title`, `author`,
/// `creator`, `createdAt` and `modifiedAt` when the document info dictionary
/// has them. Dates are kept in their PDF form (`D:YYYYMMDDHHmmSS...`).
#[derive(Debug, Default, Clone)]
pub struct PdfPageSplitter {
    /// Stop after this many pages. `None` splits the whole document.
    pub max_pages: Option<u32>,
}

impl PdfPageSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_pages(max_pages: u32) -> Self {
        Self {
            max_pages: Some(max_pages),
        }
    }

    /// Synchronous split, shared by the trait impl and direct callers.
    pub fn split(&self, file: &IngestedFile) -> Result<Vec<IngestedFile>, ProcessError> {
        let document = Document::load_mem(&file.content)
            .map_err(|e| ProcessError::Pdf(format!("failed to load {}: {}", file.name, e)))?;

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        let limit = self
            .max_pages
            .map(|m| m as usize)
            .unwrap_or(page_numbers.len());
        debug!(file = %file.name, pages = page_numbers.len(), limit, "Splitting PDF");

        let info = document_info(&document);
        let stem = Path::new(&file.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.name.clone());

        let mut pages = Vec::with_capacity(limit.min(page_numbers.len()));
        for &page_number in page_numbers.iter().take(limit) {
            let content = extract_page(&document, &page_numbers, page_number)?;

            let mut metadata = info.clone();
            metadata.insert("pageNumber".to_string(), Value::from(page_number));

            pages.push(
                IngestedFile::from_bytes(
                    format!("{stem}_page{page_number}.pdf"),
                    PDF_MIME_TYPE,
                    content,
                )
                .with_metadata(metadata),
            );
        }

        info!(file = %file.name, pages = pages.len(), "Split PDF into pages");
        Ok(pages)
    }
}

#[async_trait]
impl PreProcess for PdfPageSplitter {
    async fn process(&self, file: IngestedFile) -> Result<Option<Vec<IngestedFile>>, ProcessError> {
        let pages = self.split(&file)?;
        if pages.is_empty() {
            // No pages: keep the uploaded file as is.
            return Ok(None);
        }
        Ok(Some(pages))
    }
}

/// Copy of `document` with every page except `keep` removed.
fn extract_page(
    document: &Document,
    all_pages: &[u32],
    keep: u32,
) -> Result<Vec<u8>, ProcessError> {
    // One full clone per page: splitting is quadratic in the page count.
    let mut single = document.clone();
    let others: Vec<u32> = all_pages.iter().copied().filter(|&p| p != keep).collect();
    single.delete_pages(&others);
    single.prune_objects();

    let mut output = Vec::new();
    single
        .save_to(&mut output)
        .map_err(|e| ProcessError::Pdf(format!("failed to serialise page {}: {}", keep, e)))?;
    Ok(output)
}

/// Title, author, creator and the raw creation/modification dates from the
/// trailer's `/Info` dictionary.
fn document_info(document: &Document) -> Metadata {
    let mut metadata = Metadata::new();

    let dictionary = match document.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => document.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    let Some(dictionary) = dictionary else {
        return metadata;
    };

    for (key, field) in [
        ("Title", "title"),
        ("Author", "author"),
        ("Creator", "creator"),
        ("CreationDate", "createdAt"),
        ("ModDate", "modifiedAt"),
    ] {
        if let Ok(Object::String(bytes, _)) = dictionary.get(key.as_bytes()) {
            let value = String::from_utf8_lossy(bytes).into_owned();
            if !value.is_empty() {
                metadata.insert(field.to_string(), Value::String(value));
            }
        }
    }
    metadata
}
