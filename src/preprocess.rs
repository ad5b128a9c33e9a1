//! Pre-processing pipeline: type-keyed transforms applied to ingested files
//! before they are accepted into the list.
//!
//! A mime type maps to either a handler or an explicit no-op marker. Types with
//! no entry fall through to the optional wildcard (`other`) handler; types
//! marked no-op never do.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::contract::PreProcess;
use crate::error::ProcessError;
use crate::file::{FileId, IngestedFile};

#[derive(Clone)]
enum Entry {
    Handler(Arc<dyn PreProcess>),
    Noop,
}

/// Result of looking up a mime type in the map, before wildcard fallback.
pub enum Lookup<'a> {
    Found(&'a Arc<dyn PreProcess>),
    FoundNoop,
    NotFound,
}

/// Mime type → pre-processor map with an optional wildcard fallback.
#[derive(Clone, Default)]
pub struct PreProcessors {
    by_type: HashMap<String, Entry>,
    other: Option<Arc<dyn PreProcess>>,
}

impl std::fmt::Debug for PreProcessors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut handlers: Vec<&str> = Vec::new();
        let mut noop: Vec<&str> = Vec::new();
        for (mime_type, entry) in &self.by_type {
            match entry {
                Entry::Handler(_) => handlers.push(mime_type),
                Entry::Noop => noop.push(mime_type),
            }
        }
        f.debug_struct("PreProcessors")
            .field("handlers", &handlers)
            .field("noop", &noop)
            .field("other", &self.other.is_some())
            .finish()
    }
}

impl PreProcessors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one mime type.
    pub fn register<H>(mut self, mime_type: impl Into<String>, handler: H) -> Self
    where
        H: PreProcess + 'static,
    {
        self.by_type
            .insert(mime_type.into(), Entry::Handler(Arc::new(handler)));
        self
    }

    /// Explicitly skip pre-processing for a mime type, even if a fallback is set.
    pub fn skip(mut self, mime_type: impl Into<String>) -> Self {
        self.by_type.insert(mime_type.into(), Entry::Noop);
        self
    }

    /// Handler used for mime types without an entry.
    pub fn fallback<H>(mut self, handler: H) -> Self
    where
        H: PreProcess + 'static,
    {
        self.other = Some(Arc::new(handler));
        self
    }

    pub fn lookup(&self, mime_type: &str) -> Lookup<'_> {
        match self.by_type.get(mime_type) {
            Some(Entry::Handler(handler)) => Lookup::Found(handler),
            Some(Entry::Noop) => Lookup::FoundNoop,
            None => Lookup::NotFound,
        }
    }

    /// Handler that applies to `mime_type`, after wildcard fallback.
    pub fn resolve(&self, mime_type: &str) -> Option<&Arc<dyn PreProcess>> {
        match self.lookup(mime_type) {
            Lookup::Found(handler) => Some(handler),
            Lookup::FoundNoop => None,
            Lookup::NotFound => self.other.as_ref(),
        }
    }

    /// Runs every file's handler in order, accumulating the working set.
    ///
    /// Replacement records get fresh ids. A handler returning `Ok(None)` keeps
    /// the original record. The first handler error aborts the run.
    pub async fn run(&self, files: Vec<IngestedFile>) -> Result<Vec<IngestedFile>, ProcessError> {
        let mut working = files.clone();

        for file in files {
            let Some(handler) = self.resolve(&file.mime_type) else {
                continue;
            };
            let id = file.id.clone();
            let name = file.name.clone();
            let mime_type = file.mime_type.clone();
            debug!(file = %name, mime_type = %mime_type, "Pre-processing file");

            let processed = handler.process(file).await.map_err(|e| {
                error!(file = %name, mime_type = %mime_type, error = ?e, "Pre-processing failed");
                e
            })?;

            match processed {
                None => {
                    error!(
                        file = %name,
                        mime_type = %mime_type,
                        "Pre-processing produced nothing usable, keeping original file"
                    );
                }
                Some(replacements) => {
                    let Some(index) = working.iter().position(|f| f.id == id) else {
                        continue;
                    };
                    let replacements: Vec<IngestedFile> = replacements
                        .into_iter()
                        .map(|mut f| {
                            f.id = FileId::new();
                            f
                        })
                        .collect();
                    info!(file = %name, replacements = replacements.len(), "Pre-processing replaced file");
                    working.splice(index..=index, replacements);
                }
            }
        }

        Ok(working)
    }
}
