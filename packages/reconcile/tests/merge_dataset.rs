use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use org_map_reconcile::ReconcileError;
use org_map_reconcile::dataset::{Verification, apply_merge, dry_run};
use org_map_records_models::canonical::{CanonicalRecord, MergeSettings};
use org_map_records_models::persist::{read_json, temp_path, write_json_atomic};
use org_map_records_models::{BatchSummary, GeocodeResult, GeocodedLocation, InputRecord};
use serde_json::{Value, json};

fn fresh_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn found(id: &str, name: &str, state: &str) -> GeocodeResult {
    let record = InputRecord {
        record_id: id.to_string(),
        name: name.to_string(),
        ..InputRecord::default()
    };
    let location = GeocodedLocation {
        latitude: 32.78,
        longitude: -96.8,
        display_name: format!("{name}, {state}"),
        address: BTreeMap::from([
            ("city".to_string(), "Dallas".to_string()),
            ("state".to_string(), state.to_string()),
        ]),
        query_used: format!("{name}, school"),
        from_cache: false,
    };
    GeocodeResult::success(&record, 0, location)
}

fn write_batch(dir: &Path, results: Vec<GeocodeResult>) -> PathBuf {
    let path = dir.join("batch.json");
    let summary = BatchSummary::new(results, Vec::new(), 0, 2);
    write_json_atomic(&path, &summary).unwrap();
    path
}

fn write_lincoln_dataset(dir: &Path) -> PathBuf {
    let path = dir.join("current.json");
    let dataset = json!([
        {"recordId": "100", "name": "Lincoln HS", "state": "Ohio", "mascot": "Railsplitters"}
    ]);
    fs::write(&path, serde_json::to_string_pretty(&dataset).unwrap()).unwrap();
    path
}

fn backups(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|p| p.to_string_lossy().contains("-backup-"))
        .collect()
}

#[test]
fn merge_appends_new_records_and_backs_up_the_old_dataset() {
    let dir = fresh_dir("org_map_merge_appends");
    let dataset = write_lincoln_dataset(&dir);
    let original = fs::read(&dataset).unwrap();
    let batch = write_batch(
        &dir,
        vec![
            found("100", "Lincoln High School", "Ohio"),
            found("200", "Jefferson MS", "Texas"),
        ],
    );

    let report = apply_merge(&dataset, &batch, &MergeSettings::default()).unwrap();

    assert_eq!(report.plan.previous, 1);
    assert_eq!(report.plan.added, 1);
    assert_eq!(report.plan.skipped, 1);
    assert_eq!(report.plan.expected, 2);
    assert_eq!(report.verification, Verification::Verified);

    let backup = report.backup_path.unwrap();
    assert_eq!(fs::read(&backup).unwrap(), original);

    let records: Vec<CanonicalRecord> = read_json(&dataset).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "Lincoln HS");
    assert_eq!(records[1].record_id, "200");
    assert_eq!(records[1].state.as_deref(), Some("Texas"));
    assert_eq!(records[1].city.as_deref(), Some("Dallas"));

    // Fields the record model does not know about survive the rewrite.
    let raw: Vec<Value> = read_json(&dataset).unwrap();
    assert_eq!(raw[0]["mascot"], "Railsplitters");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn second_merge_of_the_same_batch_changes_nothing() {
    let dir = fresh_dir("org_map_merge_idempotent");
    let dataset = write_lincoln_dataset(&dir);
    let batch = write_batch(&dir, vec![found("200", "Jefferson MS", "Texas")]);
    let settings = MergeSettings::default();

    apply_merge(&dataset, &batch, &settings).unwrap();
    let after_first: Vec<CanonicalRecord> = read_json(&dataset).unwrap();
    assert_eq!(backups(&dir).len(), 1);

    let report = apply_merge(&dataset, &batch, &settings).unwrap();
    assert_eq!(report.plan.added, 0);
    assert_eq!(report.plan.skipped, 1);
    assert_eq!(report.plan.expected, 2);
    assert_eq!(report.verification, Verification::Verified);
    assert!(report.backup_path.is_some());
    assert_eq!(backups(&dir).len(), 2);

    let after_second: Vec<CanonicalRecord> = read_json(&dataset).unwrap();
    assert_eq!(after_second, after_first);
    let ids: HashSet<&str> = after_second.iter().map(|r| r.record_id.as_str()).collect();
    assert_eq!(ids.len(), after_second.len());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn empty_batch_still_backs_up_the_dataset() {
    let dir = fresh_dir("org_map_merge_empty_batch");
    let dataset = write_lincoln_dataset(&dir);
    let original = fs::read(&dataset).unwrap();
    let batch = write_batch(&dir, Vec::new());

    let report = apply_merge(&dataset, &batch, &MergeSettings::default()).unwrap();

    assert_eq!(report.plan.added, 0);
    assert_eq!(report.plan.expected, 1);
    assert!(report.is_verified());
    let backup = report.backup_path.unwrap();
    assert_eq!(fs::read(&backup).unwrap(), original);
    assert_eq!(backups(&dir), vec![backup]);

    let records: Vec<CanonicalRecord> = read_json(&dataset).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_id, "100");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn failed_write_leaves_the_dataset_byte_identical() {
    let dir = fresh_dir("org_map_merge_backup_safety");
    let dataset = write_lincoln_dataset(&dir);
    let original = fs::read(&dataset).unwrap();
    let batch = write_batch(&dir, vec![found("200", "Jefferson MS", "Texas")]);

    // A directory squatting on the temp path makes the write fail.
    fs::create_dir_all(temp_path(&dataset)).unwrap();

    let err = apply_merge(&dataset, &batch, &MergeSettings::default()).unwrap_err();
    assert!(matches!(err, ReconcileError::Write { .. }));
    assert_eq!(fs::read(&dataset).unwrap(), original);
    assert!(backups(&dir).is_empty());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_dataset_is_created_without_a_backup() {
    let dir = fresh_dir("org_map_merge_new_dataset");
    let dataset = dir.join("current.json");
    let batch = write_batch(
        &dir,
        vec![
            found("1", "Austin High School", "Texas"),
            found("2", "Boise High School", "Idaho"),
        ],
    );

    let report = apply_merge(&dataset, &batch, &MergeSettings::default()).unwrap();

    assert_eq!(report.plan.added, 2);
    assert!(report.backup_path.is_none());
    assert!(report.is_verified());
    assert!(backups(&dir).is_empty());
    let records: Vec<CanonicalRecord> = read_json(&dataset).unwrap();
    assert_eq!(records.len(), 2);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn dry_run_reports_without_writing() {
    let dir = fresh_dir("org_map_merge_dry_run");
    let dataset = write_lincoln_dataset(&dir);
    let original = fs::read(&dataset).unwrap();
    let batch = write_batch(
        &dir,
        vec![
            found("100", "Lincoln High School", "Ohio"),
            found("200", "Jefferson MS", "Texas"),
            found("201", "Houston Academy", "Texas"),
        ],
    );

    let plan = dry_run(&dataset, &batch, &MergeSettings::default()).unwrap();

    assert_eq!(plan.added, 2);
    assert_eq!(plan.skipped, 1);
    assert_eq!(plan.new_states, vec![("Texas".to_string(), 2)]);
    assert_eq!(plan.top_states[0], ("Texas".to_string(), 2));
    assert_eq!(fs::read(&dataset).unwrap(), original);
    assert!(backups(&dir).is_empty());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_batch_is_an_error() {
    let dir = fresh_dir("org_map_merge_missing_batch");
    let dataset = write_lincoln_dataset(&dir);

    let err = apply_merge(&dataset, &dir.join("none.json"), &MergeSettings::default())
        .unwrap_err();
    assert!(matches!(err, ReconcileError::BatchRead { .. }));

    let _ = fs::remove_dir_all(&dir);
}
