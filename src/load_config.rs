//! `load_config` module: reads an [`UploadConfig`] from a YAML file.
//!
//! Missing keys fall back to [`UploadConfig::default`]. Every mime type on the
//! allow-list must look like `type/subtype`; a malformed entry is a load error
//! rather than a silently useless allow-list.
//!
//! # Errors
//! All errors use `anyhow::Error` and are surfaced at the CLI boundary.

use std::fs;
use std::path::Path;

use anyhow::{bail, Result};
use regex::Regex;
use tracing::{error, info};

use crate::config::UploadConfig;

const MIME_TYPE_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*/[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*$";

/// Loads and validates an upload configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<UploadConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config = parse_config(&config_content)?;
    config.trace_loaded();
    Ok(config)
}

/// Parses and validates YAML configuration text.
pub fn parse_config(content: &str) -> Result<UploadConfig> {
    let config: UploadConfig = match serde_yaml::from_str(content) {
        Ok(conf) => conf,
        Err(e) => {
            error!(error = ?e, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let pattern = Regex::new(MIME_TYPE_PATTERN)?;
    for mime_type in &config.mime_types {
        if !pattern.is_match(mime_type) {
            error!(mime_type = %mime_type, "Invalid mime type in config");
            bail!("Invalid mime type in config: {mime_type:?}");
        }
    }
    if config.max_file_size_mb.is_nan() || config.max_file_size_mb <= 0.0 {
        bail!(
            "max_file_size_mb must be positive, got {}",
            config.max_file_size_mb
        );
    }
    if config.max_files == Some(0) {
        bail!("max_files must be at least 1 when set");
    }

    Ok(config)
}
