use crate::state::StateDocument;
use serde_json::Value;
use std::collections::BTreeSet;

/// A grow-only set of processed ids
///
/// Ids are kept sorted so committed documents are stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    ids: BTreeSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the set stored under `field`, ignoring non-string entries
    pub fn from_document(document: &StateDocument, field: &str) -> Self {
        Self {
            ids: string_list(document, field).into_iter().collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Adds an id, returning true if it was not already present
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.ids.iter().cloned().map(Value::String).collect())
    }
}

impl FromIterator<String> for SeenSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Reads a list of strings stored under `field`
///
/// Missing fields and non-array values read as an empty list; non-string
/// entries are dropped.
pub fn string_list(document: &StateDocument, field: &str) -> Vec<String> {
    match document.get(field) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Builder for the top-level fields passed to `StateStore::commit`
#[derive(Debug, Default)]
pub struct StateUpdate {
    fields: StateDocument,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(mut self, field: &str, set: &SeenSet) -> Self {
        self.fields.insert(field.to_string(), set.to_value());
        self
    }

    /// Stores a list as given, dropping duplicates but keeping first-seen order
    pub fn list<I, S>(mut self, field: &str, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let values = items
            .into_iter()
            .map(Into::into)
            .filter(|item| seen.insert(item.clone()))
            .map(Value::String)
            .collect();
        self.fields.insert(field.to_string(), Value::Array(values));
        self
    }

    /// Stores the current time as epoch seconds
    pub fn timestamp(mut self, field: &str) -> Self {
        self.fields
            .insert(field.to_string(), Value::from(chrono::Utc::now().timestamp()));
        self
    }

    pub fn into_document(self) -> StateDocument {
        self.fields
    }
}
