//! Read-only report of where a batch run stands.

use std::path::Path;

use org_map_records_models::persist::read_json;
use org_map_records_models::{BatchMetadata, BatchSummary};

use crate::checkpoint::Checkpoint;

/// Snapshot of the checkpoint and batch summary on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// The checkpoint, if one exists and is readable.
    pub checkpoint: Option<Checkpoint>,
    /// Batch summary metadata, if a run has completed.
    pub batch: Option<BatchMetadata>,
}

impl StatusReport {
    /// Reads both files. Missing or unreadable files are logged and
    /// reported as absent.
    #[must_use]
    pub fn gather(checkpoint_path: &Path, batch_path: &Path) -> Self {
        let checkpoint = match Checkpoint::load(checkpoint_path) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                log::warn!("{e}");
                None
            }
        };

        let batch = if batch_path.exists() {
            match read_json::<BatchSummary>(batch_path) {
                Ok(summary) => Some(summary.metadata),
                Err(e) => {
                    log::warn!("Unreadable batch summary {}: {e}", batch_path.display());
                    None
                }
            }
        } else {
            None
        };

        Self { checkpoint, batch }
    }

    /// Human-readable report lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match &self.checkpoint {
            Some(checkpoint) => {
                lines.push(format!("Last processed index: {}", checkpoint.last_processed_index));
                lines.push(format!("Successful geocodes: {}", checkpoint.results.len()));
                lines.push(format!("Failed geocodes: {}", checkpoint.errors.len()));
                lines.push(format!("Success rate: {:.1}%", checkpoint.success_rate()));
                lines.push(format!(
                    "Last update: {}",
                    checkpoint.timestamp.as_deref().unwrap_or("unknown")
                ));
            }
            None => lines.push("No checkpoint found".to_string()),
        }
        match &self.batch {
            Some(batch) => lines.push(format!(
                "Batch completed at {}: {} successful, {} failed ({:.1}%)",
                batch.processed_at, batch.total_results, batch.total_errors, batch.success_rate
            )),
            None => lines.push("Batch not completed yet".to_string()),
        }
        lines
    }
}
