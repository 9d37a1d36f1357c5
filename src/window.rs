//! Bounded in-memory history of recent samples.

use std::collections::VecDeque;

use crate::types::{Metric, Rail, Sample};

/// Flattened rows contributed by one sample: one row per rail per metric.
pub const ROWS_PER_SAMPLE: usize = Rail::ALL.len() * Metric::ALL.len();

/// Bounded, append-only record of recent samples, oldest first.
///
/// Capacity is counted in flattened rows (samples x rails x metrics), the
/// granularity of the export format. Eviction removes whole samples from the
/// oldest end only; samples are never split or dropped mid-sequence.
///
/// The window has exactly one writer (the poll loop). Readers receive owned
/// [`snapshot`](SampleWindow::snapshot) copies that later appends cannot
/// touch.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    max_rows: usize,
}

impl SampleWindow {
    /// Create an empty window bounded at `max_rows` flattened rows.
    pub fn new(max_rows: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            max_rows,
        }
    }

    /// Append at the newest end, then evict whole samples from the oldest
    /// end until the flattened row count is back within the bound.
    pub fn append(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.row_count() > self.max_rows {
            self.samples.pop_front();
        }
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Flattened row count across all retained samples.
    pub fn row_count(&self) -> usize {
        self.samples.len() * ROWS_PER_SAMPLE
    }

    /// Owned copy of the retained samples, oldest first. Safe to hand to
    /// another thread; future appends do not affect it.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }
}
