//! CLI for upload-control: drives the upload manager from local files.
//!
//! The `run` subcommand adds the given files (validation errors are printed),
//! uploads them through a [`SimulatedUploader`], then prints the final file
//! list as JSON and the batch status. All manager logic lives in the library;
//! this module is glue.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use crate::config::UploadConfig;
use crate::contract::{AddFileErrorSink, FinishListener};
use crate::error::AddFileError;
use crate::file::{RawFile, TrackedFile};
use crate::load_config::load_config;
use crate::manager::{Handlers, UploadManager};
use crate::simulate::SimulatedUploader;

#[derive(Parser)]
#[clap(
    name = "upload-control",
    version,
    about = "Validate, pre-process and (simulated) upload files through the upload manager"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add files, upload them through a simulated host and print the result
    Run {
        /// Path to the YAML config file (defaults apply when omitted)
        #[clap(long)]
        config: Option<PathBuf>,
        /// Split PDFs into one entry per page before upload
        #[clap(long)]
        split_pdf: bool,
        /// File name whose simulated upload should fail (repeatable)
        #[clap(long = "fail")]
        fail: Vec<String>,
        /// Delay between simulated progress ticks, in milliseconds
        #[clap(long, default_value_t = 0)]
        delay_ms: u64,
        /// Files to add
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Prints validation and ingestion errors to stderr.
struct ConsoleNotifier;

impl AddFileErrorSink for ConsoleNotifier {
    fn on_add_file_error(&self, error: &AddFileError) {
        match error.code() {
            Some(code) => eprintln!("[{code}] {error}"),
            None => eprintln!("[ERROR] {error}"),
        }
    }
}

struct ConsoleFinish;

impl FinishListener for ConsoleFinish {
    fn on_finish(&self, files: &[TrackedFile]) {
        println!("Upload finished: {} file(s)", files.len());
    }
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            config,
            split_pdf,
            fail,
            delay_ms,
            files,
        } => {
            let config = match config {
                Some(path) => load_config(path)?,
                None => UploadConfig::default(),
            };
            tracing::info!(command = "run", files = files.len(), "Starting run");

            let mut uploader =
                SimulatedUploader::new().with_delay(Duration::from_millis(delay_ms));
            for name in fail {
                uploader = uploader.fail_file(name);
            }

            let mut handlers = Handlers::new()
                .with_uploader(uploader)
                .on_add_file_error(ConsoleNotifier)
                .on_finish(ConsoleFinish);
            if split_pdf {
                handlers = with_pdf_splitter(handlers)?;
            }
            let manager = UploadManager::new(config, handlers);

            let mut inputs = Vec::with_capacity(files.len());
            for path in &files {
                match RawFile::from_path(path, mime_for_path(path)) {
                    Ok(raw) => inputs.push(raw),
                    Err(e) => bail!("Cannot read {}: {}", path.display(), e),
                }
            }

            let accepted = manager.add_files(inputs).await;
            if accepted.is_empty() {
                bail!("No files were accepted");
            }
            println!("Accepted {} file(s)", manager.files().len());

            let report = manager.upload_all_files().await?;
            println!("{}", serde_json::to_string_pretty(&manager.files())?);
            println!("Status: {}", manager.status());

            if !report.is_success() {
                tracing::error!(command = "run", failed = report.failed.len(), "Upload failed");
                bail!("{} file(s) failed to upload", report.failed.len());
            }
            tracing::info!(command = "run", "Run complete");
            Ok(())
        }
    }
}

#[cfg(feature = "pdf")]
fn with_pdf_splitter(handlers: Handlers) -> Result<Handlers> {
    use crate::pdf_pages::{PdfPageSplitter, PDF_MIME_TYPE};
    Ok(handlers.pre_process(PDF_MIME_TYPE, PdfPageSplitter::new()))
}

#[cfg(not(feature = "pdf"))]
fn with_pdf_splitter(_handlers: Handlers) -> Result<Handlers> {
    bail!("--split-pdf requires the `pdf` feature")
}

/// Mime type from the file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
