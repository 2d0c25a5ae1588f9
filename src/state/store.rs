use crate::state::StateDocument;
use crate::storage::{read_json, write_json_atomic, StorageResult};
use serde_json::Value;
use std::path::PathBuf;

/// Trait for state backends
///
/// There is no locking across processes: a single ingestion process per
/// pipeline is assumed.
pub trait StateStore: Send + Sync {
    /// Reads the whole document for `key`; an absent document is empty
    fn read_state(&self, key: &str) -> StorageResult<StateDocument>;

    /// Replaces the whole document for `key`
    fn write_state(&self, key: &str, document: &StateDocument) -> StorageResult<()>;

    /// Shallow-merges `updates` into the current document and writes it back
    ///
    /// Top-level fields present in `updates` replace the stored ones wholesale
    /// (arrays are not appended). Returns the merged document.
    fn commit(&self, key: &str, updates: StateDocument) -> StorageResult<StateDocument> {
        let mut document = self.read_state(key)?;
        document.extend(updates);
        self.write_state(key, &document)?;
        Ok(document)
    }
}

/// State store keeping one `<key>_state.json` file per pipeline
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the document for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}_state.json", key))
    }
}

impl StateStore for FileStateStore {
    fn read_state(&self, key: &str) -> StorageResult<StateDocument> {
        let path = self.path_for(key);
        match read_json::<Value>(&path)? {
            Some(Value::Object(document)) => Ok(document),
            Some(_) => {
                tracing::warn!(
                    "State document {} is not an object, starting from empty",
                    path.display()
                );
                Ok(StateDocument::new())
            }
            None => Ok(StateDocument::new()),
        }
    }

    fn write_state(&self, key: &str, document: &StateDocument) -> StorageResult<()> {
        write_json_atomic(&self.path_for(key), document)
    }
}
