//! Storage module for the raw archive
//!
//! This module handles everything written to disk, including:
//! - Atomic JSON writes (temp file + rename) shared with the state store
//! - The id-addressed raw payload tree under `<data-dir>/raw`
//! - Metadata files consumed by downstream pipelines

mod archive;
mod error;

pub use archive::{Archive, ArchiveEntry, PlayerPayload};
pub use error::{StorageError, StorageResult};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes a value as pretty-printed JSON, atomically
///
/// The document is written to a sibling `.tmp` file first and then renamed
/// over the target, so a concurrent reader sees either the old or the new
/// document, never a partial one.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = std::path::PathBuf::from(temp_name);

    let file = File::create(&temp_path).map_err(|e| StorageError::io(&temp_path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| StorageError::serialization(&temp_path, e))?;
    writer
        .flush()
        .map_err(|e| StorageError::io(&temp_path, e))?;
    drop(writer);

    fs::rename(&temp_path, path).map_err(|e| StorageError::io(path, e))
}

/// Reads a JSON document, returning `None` if the file does not exist
pub fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StorageError::serialization(path, e))
}
