pub mod anonymize;

pub use anonymize::anonymize_batch;

use crate::columnar::Columnar;
use crate::error::Result;
use crate::records::{AnonymizedRecord, IngestedRecord};
use crate::storage::BatchStore;
use chrono::{Datelike, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Outcome of one transform run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSummary {
    pub batches: usize,
    pub rows: usize,
}

/// Orchestrates the transform stage: reads raw batches lazily, anonymizes
/// each one and writes the result to the intermediate area.
pub struct BatchProcessor {
    store: Arc<dyn BatchStore>,
    input_dir: PathBuf,
    output_dir: PathBuf,
    batch_size: usize,
}

impl BatchProcessor {
    pub fn new(
        store: Arc<dyn BatchStore>,
        input_dir: PathBuf,
        output_dir: PathBuf,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            input_dir,
            output_dir,
            batch_size,
        }
    }

    /// Transforms every input batch. Zero input files is not an error: the
    /// output area is still cleared and nothing is written.
    pub fn process(&self) -> Result<ProcessSummary> {
        self.store.clear(&self.output_dir)?;

        let current_year = Utc::now().year();
        let mut summary = ProcessSummary { batches: 0, rows: 0 };
        for batch in self.store.read(&self.input_dir, self.batch_size)? {
            let rows = IngestedRecord::from_batch(&batch?)?;
            let anonymized = anonymize_batch(&rows, current_year);
            self.store
                .write(&self.output_dir, &AnonymizedRecord::to_batch(&anonymized)?, None)?;
            summary.batches += 1;
            summary.rows += anonymized.len();
        }
        info!(
            batches = summary.batches,
            rows = summary.rows,
            "transform stage complete"
        );
        Ok(summary)
    }
}
