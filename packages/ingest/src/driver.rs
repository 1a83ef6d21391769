//! The batch run loop.
//!
//! Pulls rows from the checkpoint index onward, geocodes each one, records
//! the outcome, and persists progress every `save_every` rows. Whatever
//! ends the loop (completion, a shutdown signal, or an error), the
//! checkpoint and cache are flushed before [`BatchDriver::run`] returns.

use std::path::PathBuf;
use std::sync::Arc;

use org_map_geocoder::cache::AddressCache;
use org_map_geocoder::client::{GeocodeBackend, GeocodingClient};
use org_map_geocoder::query::build_query;
use org_map_records_models::persist::write_json_atomic;
use org_map_records_models::{FailureKind, GeocodeResult, InputRecord};
use strum_macros::{AsRefStr, Display};

use crate::PipelineError;
use crate::checkpoint::ProgressStore;
use crate::progress::{ProgressCallback, null_progress};
use crate::shutdown::ShutdownSignal;

/// Run cadence and output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    /// Persist checkpoint and cache every N processed rows.
    pub save_every: u64,
    /// Log a status line every N processed rows.
    pub status_every: u64,
    /// Rows skipped before this run's first checkpoint; reported in the
    /// batch summary.
    pub skip_rows: u64,
    /// Where the batch summary is written on completion.
    pub batch_path: PathBuf,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RunOutcome {
    /// Every row was processed and the batch summary written.
    Completed,
    /// A shutdown signal stopped the run; progress was saved.
    Interrupted,
}

/// Statistics for one invocation of [`BatchDriver::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Rows processed by this invocation.
    pub processed: u64,
    /// Index of the next unprocessed row.
    pub next_index: u64,
    /// Successes accumulated across all runs of this checkpoint.
    pub successes: usize,
    /// Failures accumulated across all runs of this checkpoint.
    pub failures: usize,
    pub success_rate: f64,
    /// Batch summary path, when the run completed.
    pub batch_path: Option<PathBuf>,
}

/// Geocodes one record, turning every failure into a recorded result.
pub async fn geocode_record<B: GeocodeBackend>(
    client: &mut GeocodingClient<B>,
    cache: &mut AddressCache,
    record: &InputRecord,
    index: u64,
) -> GeocodeResult {
    let query = match build_query(record) {
        Ok(query) => query,
        Err(e) => {
            log::warn!("Row {index} ({}): {e}", record.record_id);
            return GeocodeResult::failure(record, index, FailureKind::InsufficientData);
        }
    };

    match client.resolve(&query.variants, cache).await {
        Ok(location) => {
            log::debug!(
                "Geocoded {} -> {} ({:.4}, {:.4})",
                record.name,
                location.display_name,
                location.latitude,
                location.longitude
            );
            GeocodeResult::success(record, index, location)
        }
        Err(e) => {
            log::warn!("Row {index} ({}): {e}", record.name);
            GeocodeResult::failure(record, index, e.failure_kind())
        }
    }
}

/// Owns every store for one run.
pub struct BatchDriver<B> {
    client: GeocodingClient<B>,
    cache: AddressCache,
    store: ProgressStore,
    options: DriverOptions,
    shutdown: ShutdownSignal,
    progress: Arc<dyn ProgressCallback>,
    processed: u64,
}

impl<B: GeocodeBackend> BatchDriver<B> {
    #[must_use]
    pub fn new(
        client: GeocodingClient<B>,
        cache: AddressCache,
        store: ProgressStore,
        options: DriverOptions,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            client,
            cache,
            store,
            options,
            shutdown,
            progress: null_progress(),
            processed: 0,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &ProgressStore {
        &self.store
    }

    #[must_use]
    pub const fn cache(&self) -> &AddressCache {
        &self.cache
    }

    #[must_use]
    pub const fn client(&self) -> &GeocodingClient<B> {
        &self.client
    }

    /// Processes `rows` from the checkpoint index to the end.
    ///
    /// `rows` is the full source extract; indices are absolute positions in
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the checkpoint, cache, or batch summary
    /// cannot be written. The checkpoint and cache are still flushed (best
    /// effort) before the error is returned.
    pub async fn run(&mut self, rows: &[InputRecord]) -> Result<RunReport, PipelineError> {
        let total = rows.len() as u64;
        let start = self.store.next_index();
        self.processed = 0;

        self.progress.begin(total, start.min(total));
        if start >= total {
            log::info!("Nothing to process: checkpoint index {start} covers all {total} rows");
        } else {
            log::info!(
                "Processing rows {start}..{total} ({} remaining, {} cached addresses)",
                total - start,
                self.cache.len()
            );
        }

        self.store.start();
        let outcome = self.process(rows, start).await;
        let flushed = self.flush();
        let outcome = outcome?;
        flushed?;

        let batch_path = match outcome {
            RunOutcome::Completed => {
                self.store.mark_completed();
                Some(self.write_summary()?)
            }
            RunOutcome::Interrupted => {
                self.store.mark_interrupted();
                log::info!(
                    "Interrupted at row {}; rerun to resume",
                    self.store.next_index()
                );
                None
            }
        };

        let checkpoint = self.store.checkpoint();
        let report = RunReport {
            outcome,
            processed: self.processed,
            next_index: self.store.next_index(),
            successes: checkpoint.results.len(),
            failures: checkpoint.errors.len(),
            success_rate: checkpoint.success_rate(),
            batch_path,
        };
        self.progress.finish(format!(
            "{outcome}: {} successful, {} failed ({:.1}%)",
            report.successes, report.failures, report.success_rate
        ));
        Ok(report)
    }

    async fn process(
        &mut self,
        rows: &[InputRecord],
        start: u64,
    ) -> Result<RunOutcome, PipelineError> {
        let start = usize::try_from(start).unwrap_or(usize::MAX);
        let remaining = rows.len().saturating_sub(start) as u64;

        for (offset, record) in rows.iter().enumerate().skip(start) {
            if self.shutdown.is_triggered() {
                return Ok(RunOutcome::Interrupted);
            }

            let index = offset as u64;
            let shutdown = self.shutdown.clone();
            let result = tokio::select! {
                biased;
                () = shutdown.triggered() => {
                    log::warn!("Abandoning in-flight row {index} ({})", record.record_id);
                    return Ok(RunOutcome::Interrupted);
                }
                result = geocode_record(&mut self.client, &mut self.cache, record, index) => result,
            };

            self.store.record(result);
            self.processed += 1;
            self.progress.row_done();

            if self.processed % self.options.status_every.max(1) == 0 {
                self.log_status(remaining);
            }
            if self.store.unsaved() >= self.options.save_every {
                self.save()?;
                log::info!("Progress saved after {} rows", self.processed);
            }
        }

        Ok(RunOutcome::Completed)
    }

    fn log_status(&self, remaining: u64) {
        let checkpoint = self.store.checkpoint();
        let message = format!(
            "Processed {}/{remaining}. Success rate: {:.1}% ({} successful, {} failed)",
            self.processed,
            checkpoint.success_rate(),
            checkpoint.results.len(),
            checkpoint.errors.len()
        );
        log::info!("{message}");
        self.progress.status(message);
    }

    fn save(&mut self) -> Result<(), PipelineError> {
        self.store.save()?;
        self.cache.save()?;
        Ok(())
    }

    /// Saves both stores, attempting the cache even if the checkpoint fails.
    fn flush(&mut self) -> Result<(), PipelineError> {
        let checkpoint = self.store.save();
        let cache = self.cache.save();
        checkpoint?;
        cache?;
        Ok(())
    }

    fn write_summary(&self) -> Result<PathBuf, PipelineError> {
        let summary = self.store.summary(self.options.skip_rows);
        let path = self.options.batch_path.clone();
        write_json_atomic(&path, &summary).map_err(|source| PipelineError::Summary {
            path: path.clone(),
            source,
        })?;
        log::info!(
            "Batch complete: {} successful, {} failed ({:.1}%); summary written to {}",
            summary.metadata.total_results,
            summary.metadata.total_errors,
            summary.metadata.success_rate,
            path.display()
        );
        Ok(path)
    }
}
