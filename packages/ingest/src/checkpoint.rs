//! Checkpoint log for resumable batch runs.
//!
//! The checkpoint file records the index of the next unprocessed source row
//! plus every result accumulated so far:
//!
//! ```json
//! { "last_processed_index": 57, "results": [...], "errors": [...], "timestamp": "..." }
//! ```
//!
//! The index only ever moves forward, one row at a time, and a resumed run
//! starts at exactly that index.

use std::path::{Path, PathBuf};

use chrono::Utc;
use org_map_records_models::persist::{read_json, write_json_atomic};
use org_map_records_models::{BatchSummary, GeocodeResult, success_rate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Errors from reading or writing the checkpoint file.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The checkpoint file could not be read or written.
    #[error("Checkpoint I/O error on {path}: {source}")]
    Io {
        /// Checkpoint path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The checkpoint file exists but is not a valid checkpoint.
    #[error("Checkpoint {path} is corrupt: {message}")]
    Corrupt {
        /// Checkpoint path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

/// The persisted checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Index of the next source row to process.
    pub last_processed_index: u64,
    /// Successful results, in processing order.
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    /// Failed results, in processing order.
    #[serde(default)]
    pub errors: Vec<GeocodeResult>,
    /// When the checkpoint was last written (RFC 3339). Kept as text so
    /// older files with naive local timestamps still load.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Checkpoint {
    /// Reads the checkpoint at `path`.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// * [`CheckpointError::Corrupt`] if the file is not valid checkpoint JSON
    /// * [`CheckpointError::Io`] if the file exists but cannot be read
    pub fn load(path: &Path) -> Result<Option<Self>, CheckpointError> {
        if !path.exists() {
            return Ok(None);
        }
        read_json(path).map(Some).map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                CheckpointError::Corrupt {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            } else {
                CheckpointError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })
    }

    /// Total rows recorded (successes plus failures).
    #[must_use]
    pub fn processed(&self) -> usize {
        self.results.len() + self.errors.len()
    }

    /// Success percentage over everything recorded.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        success_rate(self.results.len(), self.errors.len())
    }
}

/// Lifecycle of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    /// No checkpoint existed; starting from the skip offset.
    NotStarted,
    /// Rows are being processed.
    Running,
    /// A stop signal was observed and progress was flushed.
    Interrupted,
    /// Every row was processed.
    Completed,
}

/// Owns the checkpoint for one run and persists it on demand.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    checkpoint: Checkpoint,
    state: RunState,
    unsaved: u64,
}

impl ProgressStore {
    /// Opens the checkpoint at `path`, falling back to `skip_rows` when
    /// there is nothing to resume.
    ///
    /// A corrupt or unreadable checkpoint is logged and treated as absent.
    /// A loaded checkpoint's index wins even when `skip_rows` is larger.
    #[must_use]
    pub fn open(path: &Path, skip_rows: u64) -> Self {
        let fresh = || Checkpoint {
            last_processed_index: skip_rows,
            ..Checkpoint::default()
        };

        let (checkpoint, state) = match Checkpoint::load(path) {
            Ok(Some(checkpoint)) => {
                log::info!(
                    "Resuming from index {} with {} results and {} errors",
                    checkpoint.last_processed_index,
                    checkpoint.results.len(),
                    checkpoint.errors.len()
                );
                if skip_rows > checkpoint.last_processed_index {
                    log::warn!(
                        "Skip offset {skip_rows} is past the checkpoint index {}; keeping the checkpoint index",
                        checkpoint.last_processed_index
                    );
                }
                (checkpoint, RunState::Interrupted)
            }
            Ok(None) => {
                log::info!("No checkpoint at {}; starting at row {skip_rows}", path.display());
                (fresh(), RunState::NotStarted)
            }
            Err(e) => {
                log::warn!("{e}; starting over at row {skip_rows}");
                (fresh(), RunState::NotStarted)
            }
        };

        Self {
            path: path.to_path_buf(),
            checkpoint,
            state,
            unsaved: 0,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Index of the next row to process.
    #[must_use]
    pub const fn next_index(&self) -> u64 {
        self.checkpoint.last_processed_index
    }

    /// Rows recorded since the last save.
    #[must_use]
    pub const fn unsaved(&self) -> u64 {
        self.unsaved
    }

    /// Marks the run as processing rows.
    pub fn start(&mut self) {
        self.state = RunState::Running;
    }

    /// Appends `result` and advances the index by one.
    pub fn record(&mut self, result: GeocodeResult) {
        if result.is_success() {
            self.checkpoint.results.push(result);
        } else {
            self.checkpoint.errors.push(result);
        }
        self.checkpoint.last_processed_index += 1;
        self.unsaved += 1;
    }

    /// Writes the checkpoint file.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Io`] if the file cannot be written.
    pub fn save(&mut self) -> Result<(), CheckpointError> {
        self.checkpoint.timestamp = Some(Utc::now().to_rfc3339());
        write_json_atomic(&self.path, &self.checkpoint).map_err(|source| CheckpointError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.unsaved = 0;
        log::debug!(
            "Saved checkpoint at index {} to {}",
            self.checkpoint.last_processed_index,
            self.path.display()
        );
        Ok(())
    }

    pub fn mark_interrupted(&mut self) {
        self.state = RunState::Interrupted;
    }

    pub fn mark_completed(&mut self) {
        self.state = RunState::Completed;
    }

    /// Builds the batch summary from everything recorded.
    #[must_use]
    pub fn summary(&self, skipped_rows: u64) -> BatchSummary {
        BatchSummary::new(
            self.checkpoint.results.clone(),
            self.checkpoint.errors.clone(),
            skipped_rows,
            self.checkpoint.last_processed_index,
        )
    }
}
