//! Statistics from pipeline state documents
//!
//! This module summarises what each pipeline has ingested so far, reading
//! only the persisted state documents (no network access).

use crate::crawler::Pipeline;
use crate::state::{fields, StateDocument, StateStore};
use crate::storage::StorageResult;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// Progress summary of one pipeline
#[derive(Debug, Clone)]
pub struct PipelineStatistics {
    pub pipeline: Pipeline,

    /// When the pipeline last finished a run
    pub last_run: Option<DateTime<Utc>>,

    /// Size of every id list in the state document
    pub id_counts: BTreeMap<String, usize>,
}

impl PipelineStatistics {
    fn from_document(pipeline: Pipeline, document: &StateDocument) -> Self {
        let last_run = document
            .get(fields::LAST_RUN_TIME)
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        let id_counts = document
            .iter()
            .filter_map(|(field, value)| match value {
                Value::Array(items) => Some((field.clone(), items.len())),
                _ => None,
            })
            .collect();

        Self {
            pipeline,
            last_run,
            id_counts,
        }
    }

    /// True if the pipeline has never committed state
    pub fn is_empty(&self) -> bool {
        self.last_run.is_none() && self.id_counts.is_empty()
    }
}

/// Loads statistics for every pipeline
pub fn load_statistics(store: &dyn StateStore) -> StorageResult<Vec<PipelineStatistics>> {
    Pipeline::ALL
        .iter()
        .map(|pipeline| {
            let document = store.read_state(pipeline.state_key())?;
            Ok(PipelineStatistics::from_document(*pipeline, &document))
        })
        .collect()
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &[PipelineStatistics]) {
    println!("=== Ingestion Statistics ===\n");

    for pipeline in stats {
        println!("{} ({}):", pipeline.pipeline, pipeline.pipeline.state_key());

        if pipeline.is_empty() {
            println!("  never run");
            println!();
            continue;
        }

        match pipeline.last_run {
            Some(time) => println!("  Last run: {}", time.format("%Y-%m-%d %H:%M:%S UTC")),
            None => println!("  Last run: unfinished"),
        }
        for (field, count) in &pipeline.id_counts {
            println!("  {}: {}", field, count);
        }
        println!();
    }
}
