//! Checkpoint store implementation
//!
//! Provides file-based offset persistence with atomic writes.

use crate::error::{Error, Result};
use crate::types::Offset;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads and saves the tail offset
#[derive(Debug, Clone, Default)]
pub struct CheckpointStore {
    /// Path to the checkpoint file, `None` when checkpointing is disabled
    path: Option<PathBuf>,
}

impl CheckpointStore {
    /// Create a store backed by the given file
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Create a store that never touches the filesystem
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Create a store from an optional path
    pub fn from_option(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Get the checkpoint file path
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Check if checkpointing is disabled
    pub fn is_disabled(&self) -> bool {
        self.path.is_none()
    }

    /// Load the stored offset
    ///
    /// A missing file is a cold start and yields 0.
    pub async fn load(&self) -> Result<Offset> {
        let Some(path) = &self.path else {
            return Ok(0);
        };

        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No checkpoint at {}, starting from offset 0", path.display());
                return Ok(0);
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(Error::invalid_checkpoint(
                    path.display().to_string(),
                    "not valid UTF-8",
                ));
            }
            Err(e) => {
                return Err(Error::checkpoint(format!(
                    "Failed to read checkpoint file {}: {e}",
                    path.display()
                )));
            }
        };

        parse_checkpoint(&contents)
            .map_err(|message| Error::invalid_checkpoint(path.display().to_string(), message))
    }

    /// Save the offset, replacing any previous checkpoint
    pub async fn save(&self, offset: Offset) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let contents = format!("{offset}\n");

        // Write to temp file first, then rename for atomicity
        let temp_path = temp_path_for(path);
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::Checkpoint {
                message: format!("Failed to write checkpoint file: {e}"),
            })?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| Error::Checkpoint {
                message: format!("Failed to rename checkpoint file: {e}"),
            })?;

        Ok(())
    }
}

/// Sibling temp file for `path`, e.g. `app.offset` → `app.offset.tmp`
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Parse checkpoint contents into an offset
///
/// Accepts a single non-negative base-10 integer with at most one trailing
/// newline.
pub fn parse_checkpoint(contents: &str) -> std::result::Result<Offset, String> {
    let value = contents.strip_suffix('\n').unwrap_or(contents);

    if value.is_empty() {
        return Err("checkpoint file is empty".to_string());
    }

    if let Some(rest) = value.strip_prefix('-') {
        if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("negative offset {value}"));
        }
    }

    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("expected a decimal offset, found {value:?}"));
    }

    value
        .parse::<Offset>()
        .map_err(|e| format!("offset {value} out of range: {e}"))
}
