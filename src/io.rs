//! Reading graph snapshots and layout configs, writing frames
//!
//! Files are JSON or YAML, chosen by extension.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::{ConfigError, LayoutConfig};
use crate::graph::GraphSnapshot;
use crate::scheduler::Frame;

/// Errors that can occur during reading or writing
#[derive(Error, Debug)]
pub enum LayoutIoError {
    /// The file extension is not one we can parse
    #[error("could not determine file format from path: {0}")]
    UnknownExtension(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The config parsed but holds unusable values
    #[error("invalid layout config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("file watch error: {0}")]
    Watch(#[from] notify::Error),
}

/// Result type for layout I/O operations
pub type IoResult<T> = Result<T, LayoutIoError>;

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Determine the format from a file extension
    pub fn from_path(path: &Path) -> IoResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| LayoutIoError::UnknownExtension(path.display().to_string()))?;

        if ext.eq_ignore_ascii_case("json") {
            Ok(Format::Json)
        } else if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") {
            Ok(Format::Yaml)
        } else {
            Err(LayoutIoError::UnknownExtension(path.display().to_string()))
        }
    }
}

fn read_as<T: serde::de::DeserializeOwned>(path: &Path) -> IoResult<T> {
    let format = Format::from_path(path)?;
    let contents = fs::read_to_string(path)?;
    match format {
        Format::Json => Ok(serde_json::from_str(&contents)?),
        Format::Yaml => Ok(serde_yaml::from_str(&contents)?),
    }
}

/// Read a graph snapshot from a JSON or YAML file
pub fn read_snapshot(path: &Path) -> IoResult<GraphSnapshot> {
    read_as(path)
}

/// Read and validate a layout config from a JSON or YAML file
pub fn read_config(path: &Path) -> IoResult<LayoutConfig> {
    let config: LayoutConfig = read_as(path)?;
    config.validate()?;
    Ok(config)
}

/// Write a frame as pretty-printed JSON
pub fn write_frame(frame: &Frame, path: &Path) -> IoResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(frame)?;
    fs::write(path, json)?;
    Ok(())
}
