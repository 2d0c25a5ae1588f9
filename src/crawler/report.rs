use crate::api::ErrorClass;
use crate::crawler::Pipeline;
use std::fmt;

/// Why an item produced no new archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Seen before and still archived
    AlreadySeen,
    /// Outside the configured time window
    Filtered,
    /// Upstream returned no usable data
    Empty,
    /// Fetching or archiving failed; retried next run
    Failed(ErrorClass),
}

/// Result of processing one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Stored,
    Skipped(SkipReason),
}

/// Per-run tally of item outcomes
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub pipeline: Pipeline,
    pub stored: usize,
    pub already_seen: usize,
    pub filtered: usize,
    pub empty: usize,
    pub failed: usize,

    /// Ids first discovered during this run
    pub new_ids: Vec<String>,
}

impl CrawlReport {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            stored: 0,
            already_seen: 0,
            filtered: 0,
            empty: 0,
            failed: 0,
            new_ids: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Stored => self.stored += 1,
            ItemOutcome::Skipped(SkipReason::AlreadySeen) => self.already_seen += 1,
            ItemOutcome::Skipped(SkipReason::Filtered) => self.filtered += 1,
            ItemOutcome::Skipped(SkipReason::Empty) => self.empty += 1,
            ItemOutcome::Skipped(SkipReason::Failed(_)) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.stored + self.already_seen + self.filtered + self.empty + self.failed
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} stored, {} already seen, {} filtered, {} empty, {} failed ({} new ids)",
            self.pipeline,
            self.stored,
            self.already_seen,
            self.filtered,
            self.empty,
            self.failed,
            self.new_ids.len()
        )
    }
}
