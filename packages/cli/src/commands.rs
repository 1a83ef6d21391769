//! Subcommand implementations shared by the flag-driven and interactive
//! entry points.

use std::path::Path;
use std::time::Instant;

use org_map_cli_utils::{IndicatifProgress, MultiProgress};
use org_map_ingest::config::PipelineConfig;
use org_map_ingest::driver::{RunOutcome, RunReport};
use org_map_ingest::shutdown::ShutdownSignal;
use org_map_ingest::status::StatusReport;
use org_map_reconcile::dataset::{self, Verification};

/// Geocodes `input`, resuming from the checkpoint if there is one.
///
/// # Errors
///
/// Returns an error if the run cannot start or its progress cannot be
/// saved.
pub async fn geocode(
    config: &PipelineConfig,
    input: &Path,
    multi: &MultiProgress,
) -> Result<RunReport, Box<dyn std::error::Error>> {
    let shutdown = ShutdownSignal::new();
    shutdown.install_handlers();

    let progress = IndicatifProgress::rows_bar(multi, "Geocoding organizations");
    let start = Instant::now();
    let report = org_map_ingest::geocode_file(config, input, shutdown, progress).await?;

    log::info!(
        "Geocode {}: {} rows this run in {:.1}s, next index {}, {:.1}% success overall",
        report.outcome,
        report.processed,
        start.elapsed().as_secs_f64(),
        report.next_index,
        report.success_rate
    );
    Ok(report)
}

/// Merges the batch summary into the canonical dataset.
///
/// # Errors
///
/// Returns an error if the merge fails or the rewritten dataset does not
/// hold the expected number of records.
pub fn merge(config: &PipelineConfig, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    if dry_run {
        dataset::dry_run(&config.dataset_path, &config.batch_path, &config.merge)?;
        return Ok(());
    }

    let report = dataset::apply_merge(&config.dataset_path, &config.batch_path, &config.merge)?;
    if let Verification::Mismatch { expected, actual } = report.verification {
        let found = actual.map_or_else(|| "an unreadable file".to_string(), |n| n.to_string());
        return Err(format!(
            "{} failed verification: expected {expected} records, found {found}",
            config.dataset_path.display()
        )
        .into());
    }
    Ok(())
}

/// Geocodes `input` and, if the run completes, merges the batch.
///
/// # Errors
///
/// Returns an error if either step fails.
pub async fn run(
    config: &PipelineConfig,
    input: &Path,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = geocode(config, input, multi).await?;
    match report.outcome {
        RunOutcome::Completed => merge(config, false),
        RunOutcome::Interrupted => {
            log::warn!("Geocoding was interrupted; skipping merge");
            Ok(())
        }
    }
}

/// Prints where the current batch run stands.
pub fn status(config: &PipelineConfig) {
    let report = StatusReport::gather(&config.checkpoint_path, &config.batch_path);
    for line in report.lines() {
        println!("{line}");
    }
}
