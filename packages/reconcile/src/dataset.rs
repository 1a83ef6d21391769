//! Reading, backing up, rewriting, and verifying the canonical dataset.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use org_map_records_models::canonical::{CanonicalRecord, MergeSettings};
use org_map_records_models::persist::{read_json, write_json_atomic};
use org_map_records_models::{BatchSummary, GeocodeResult};
use serde_json::Value;
use strum_macros::{AsRefStr, Display};

use crate::ReconcileError;
use crate::merge::{MergeOutcome, merge, top_states};

/// Number of states listed in merge statistics.
pub const TOP_STATES: usize = 10;

/// Loads the canonical dataset.
///
/// A missing file is an empty dataset; `Ok((records, false))` tells the
/// caller there was nothing to back up.
///
/// # Errors
///
/// Returns [`ReconcileError::DatasetRead`] if the file exists but cannot be
/// read or parsed.
pub fn load_dataset(path: &Path) -> Result<(Vec<CanonicalRecord>, bool), ReconcileError> {
    match read_json(path) {
        Ok(records) => Ok((records, true)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("No dataset at {}; starting empty", path.display());
            Ok((Vec::new(), false))
        }
        Err(source) => Err(ReconcileError::DatasetRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Loads the successful results of a batch summary.
///
/// # Errors
///
/// Returns [`ReconcileError::BatchRead`] if the summary cannot be read or
/// parsed.
pub fn load_batch(path: &Path) -> Result<Vec<GeocodeResult>, ReconcileError> {
    let summary: BatchSummary = read_json(path).map_err(|source| ReconcileError::BatchRead {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Loaded {} geocoded records from {} (batch finalized {})",
        summary.successful_geocodes.len(),
        path.display(),
        summary.metadata.processed_at
    );
    Ok(summary.successful_geocodes)
}

/// `<dir>/<stem>-backup-<YYYYMMDD-HHMMSS>.json` next to `dataset`.
#[must_use]
pub fn backup_path(dataset: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = dataset
        .file_stem()
        .map_or_else(|| "dataset".into(), |s| s.to_string_lossy());
    dataset.with_file_name(format!(
        "{stem}-backup-{}.json",
        now.format("%Y%m%d-%H%M%S")
    ))
}

// Two merges in the same second must not clobber the earlier backup.
fn unused_backup_path(dataset: &Path) -> PathBuf {
    let base = backup_path(dataset, Local::now());
    if !base.exists() {
        return base;
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (1..)
        .map(|n| base.with_file_name(format!("{stem}-{n}.json")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(base)
}

/// What a merge would do, computed without touching any file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    pub previous: usize,
    pub added: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub collapsed: usize,
    /// Record count the dataset will have afterwards.
    pub expected: usize,
    /// State distribution of the records to be added.
    pub new_states: Vec<(String, usize)>,
    /// Top states of the merged dataset.
    pub top_states: Vec<(String, usize)>,
}

impl MergePlan {
    fn from_outcome(outcome: &MergeOutcome) -> Self {
        Self {
            previous: outcome.previous,
            added: outcome.added,
            skipped: outcome.skipped,
            rejected: outcome.rejected,
            collapsed: outcome.collapsed,
            expected: outcome.merged.len(),
            new_states: top_states(outcome.new_records(), usize::MAX),
            top_states: top_states(&outcome.merged, TOP_STATES),
        }
    }

    /// Human-readable statistics, one line per entry.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Previous records: {}", self.previous),
            format!("Added: {}", self.added),
            format!("Skipped (already present): {}", self.skipped),
            format!("Rejected (no ID or location): {}", self.rejected),
            format!("Final count: {}", self.expected),
        ];
        if self.collapsed > 0 {
            lines.push(format!("Duplicate dataset records dropped: {}", self.collapsed));
        }
        if !self.new_states.is_empty() {
            lines.push("New records by state:".to_string());
            lines.extend(
                self.new_states
                    .iter()
                    .map(|(state, count)| format!("  {state}: {count}")),
            );
        }
        if !self.top_states.is_empty() {
            lines.push("Top states:".to_string());
            lines.extend(
                self.top_states
                    .iter()
                    .map(|(state, count)| format!("  {state}: {count}")),
            );
        }
        lines
    }
}

/// Post-write check of the rewritten dataset.
#[derive(Debug, Clone, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Verification {
    /// The file holds exactly the expected number of records.
    Verified,
    /// The file could not be re-read or its count differs.
    Mismatch {
        expected: usize,
        /// `None` when the file could not be re-read.
        actual: Option<usize>,
    },
}

/// Result of [`apply_merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub plan: MergePlan,
    /// Where the previous dataset was moved, if one existed.
    pub backup_path: Option<PathBuf>,
    pub verification: Verification,
}

impl MergeReport {
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self.verification, Verification::Verified)
    }
}

/// Computes the merge of `batch_path` into `dataset_path` without writing.
///
/// # Errors
///
/// Returns [`ReconcileError`] if either file cannot be read.
pub fn dry_run(
    dataset_path: &Path,
    batch_path: &Path,
    settings: &MergeSettings,
) -> Result<MergePlan, ReconcileError> {
    let (canonical, _) = load_dataset(dataset_path)?;
    let batch = load_batch(batch_path)?;
    let plan = MergePlan::from_outcome(&merge(canonical, &batch, settings));
    for line in plan.lines() {
        log::info!("[dry run] {line}");
    }
    Ok(plan)
}

/// Merges `batch_path` into `dataset_path`.
///
/// The existing dataset is renamed to a timestamped backup, the merged list
/// is written atomically in its place, and the result is re-read to check
/// its record count. If the write fails the backup is moved back, leaving
/// the dataset as it was. An existing dataset is backed up on every merge,
/// including one that adds nothing.
///
/// # Errors
///
/// Returns [`ReconcileError`] if an input cannot be read, the backup cannot
/// be made, or the merged dataset cannot be written. A count mismatch after
/// writing is not an error; it is reported in [`MergeReport::verification`].
pub fn apply_merge(
    dataset_path: &Path,
    batch_path: &Path,
    settings: &MergeSettings,
) -> Result<MergeReport, ReconcileError> {
    let (canonical, existed) = load_dataset(dataset_path)?;
    let batch = load_batch(batch_path)?;
    let outcome = merge(canonical, &batch, settings);
    let plan = MergePlan::from_outcome(&outcome);

    let backup = if existed {
        let backup = unused_backup_path(dataset_path);
        fs::rename(dataset_path, &backup).map_err(|source| ReconcileError::Backup {
            path: backup.clone(),
            source,
        })?;
        log::info!("Backed up {} to {}", dataset_path.display(), backup.display());
        Some(backup)
    } else {
        None
    };

    if let Err(source) = write_json_atomic(dataset_path, &outcome.merged) {
        log::error!("Failed to write {}: {source}", dataset_path.display());
        if let Some(backup) = &backup {
            fs::rename(backup, dataset_path).map_err(|restore| ReconcileError::Restore {
                path: dataset_path.to_path_buf(),
                backup: backup.clone(),
                source: restore,
            })?;
            log::warn!("Restored {} from backup", dataset_path.display());
        }
        return Err(ReconcileError::Write {
            path: dataset_path.to_path_buf(),
            source,
        });
    }

    let verification = verify(dataset_path, plan.expected);
    for line in plan.lines() {
        log::info!("{line}");
    }
    match &verification {
        Verification::Mismatch { expected, actual } => log::error!(
            "Verification failed for {}: expected {expected} records, found {}",
            dataset_path.display(),
            actual.map_or_else(|| "an unreadable file".to_string(), |n| n.to_string())
        ),
        Verification::Verified => log::info!(
            "Verified {} records in {}",
            plan.expected,
            dataset_path.display()
        ),
    }

    Ok(MergeReport {
        plan,
        backup_path: backup,
        verification,
    })
}

fn verify(path: &Path, expected: usize) -> Verification {
    match read_json::<Vec<Value>>(path) {
        Ok(records) if records.len() == expected => Verification::Verified,
        Ok(records) => Verification::Mismatch {
            expected,
            actual: Some(records.len()),
        },
        Err(e) => {
            log::error!("Failed to re-read {}: {e}", path.display());
            Verification::Mismatch {
                expected,
                actual: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fresh_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn backup_name_is_timestamped_next_to_the_dataset() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let path = backup_path(Path::new("/data/geocoded-current.json"), now);
        assert_eq!(
            path,
            PathBuf::from("/data/geocoded-current-backup-20240309-070501.json")
        );
    }

    #[test]
    fn backups_in_the_same_second_get_distinct_names() {
        let dir = fresh_dir("org_map_reconcile_backup_names");
        let dataset = dir.join("current.json");
        let first = unused_backup_path(&dataset);
        fs::write(&first, "[]").unwrap();

        let second = unused_backup_path(&dataset);
        assert_ne!(first, second);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_dataset_loads_empty() {
        let dir = fresh_dir("org_map_reconcile_missing_dataset");
        let (records, existed) = load_dataset(&dir.join("absent.json")).unwrap();
        assert!(records.is_empty());
        assert!(!existed);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_dataset_is_an_error() {
        let dir = fresh_dir("org_map_reconcile_corrupt_dataset");
        let path = dir.join("current.json");
        fs::write(&path, "[{").unwrap();
        assert!(matches!(
            load_dataset(&path),
            Err(ReconcileError::DatasetRead { .. })
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn verify_reports_count_differences() {
        let dir = fresh_dir("org_map_reconcile_verify");
        let path = dir.join("current.json");
        fs::write(&path, r#"[{"recordId":"1"},{"recordId":"2"}]"#).unwrap();

        assert_eq!(verify(&path, 2), Verification::Verified);
        assert_eq!(
            verify(&path, 3),
            Verification::Mismatch {
                expected: 3,
                actual: Some(2)
            }
        );
        assert_eq!(
            verify(&dir.join("gone.json"), 1),
            Verification::Mismatch {
                expected: 1,
                actual: None
            }
        );

        let _ = fs::remove_dir_all(&dir);
    }
}
