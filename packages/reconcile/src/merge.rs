//! Pure merge of a geocoded batch into the canonical record list.

use std::collections::{BTreeMap, HashSet};

use org_map_records_models::GeocodeResult;
use org_map_records_models::canonical::{CanonicalRecord, MergeSettings};

use crate::convert::convert;

/// State label used for records without one.
pub const UNKNOWN_STATE: &str = "Unknown";

/// Result of [`merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Canonical records followed by the newly converted ones.
    pub merged: Vec<CanonicalRecord>,
    /// Records in the canonical list before merging, after collapsing
    /// duplicate keys.
    pub previous: usize,
    pub added: usize,
    /// Batch records whose key already existed.
    pub skipped: usize,
    /// Batch records with a blank key or no location.
    pub rejected: usize,
    /// Duplicate keys already present in the canonical list and dropped.
    pub collapsed: usize,
}

impl MergeOutcome {
    /// The records appended by this merge.
    #[must_use]
    pub fn new_records(&self) -> &[CanonicalRecord] {
        &self.merged[self.previous..]
    }
}

/// Appends every batch result whose record ID is not yet present.
///
/// Existing records are never overwritten or field-merged; the first record
/// seen for a key wins, including keys added earlier in the same batch.
#[must_use]
pub fn merge(
    canonical: Vec<CanonicalRecord>,
    batch: &[GeocodeResult],
    settings: &MergeSettings,
) -> MergeOutcome {
    let mut seen = HashSet::with_capacity(canonical.len() + batch.len());
    let mut merged = Vec::with_capacity(canonical.len() + batch.len());
    let mut collapsed = 0;

    for record in canonical {
        if seen.insert(record.identity_key().to_string()) {
            merged.push(record);
        } else {
            log::warn!(
                "Dropping duplicate dataset record {} ({})",
                record.record_id,
                record.name
            );
            collapsed += 1;
        }
    }
    let previous = merged.len();

    let mut added = 0;
    let mut skipped = 0;
    let mut rejected = 0;

    for result in batch {
        let key = result.record_id.trim();
        let location = match result.location.as_ref() {
            Some(location) if !key.is_empty() => location,
            _ => {
                log::debug!("Rejecting batch row {} ({})", result.index, result.company_name);
                rejected += 1;
                continue;
            }
        };

        if !seen.insert(key.to_string()) {
            skipped += 1;
            continue;
        }

        merged.push(convert(result, location, settings));
        added += 1;
    }

    MergeOutcome {
        merged,
        previous,
        added,
        skipped,
        rejected,
        collapsed,
    }
}

/// Counts records per state, largest first, ties broken by name.
#[must_use]
pub fn top_states(records: &[CanonicalRecord], limit: usize) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        let state = record
            .state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_STATE);
        *counts.entry(state).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(state, count)| (state.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    use org_map_records_models::{FailureKind, GeocodedLocation, InputRecord};

    fn found(id: &str, name: &str, state: &str) -> GeocodeResult {
        let record = InputRecord {
            record_id: id.to_string(),
            name: name.to_string(),
            ..InputRecord::default()
        };
        let location = GeocodedLocation {
            latitude: 31.0,
            longitude: -99.0,
            display_name: format!("{name}, {state}"),
            address: BTreeMap::from([("state".to_string(), state.to_string())]),
            query_used: format!("{name}, school"),
            from_cache: false,
        };
        GeocodeResult::success(&record, 0, location)
    }

    fn lincoln() -> CanonicalRecord {
        CanonicalRecord {
            state: Some("Ohio".to_string()),
            ..CanonicalRecord::new("100", "Lincoln HS")
        }
    }

    #[test]
    fn existing_keys_are_skipped_and_new_ones_appended() {
        let batch = vec![
            found("100", "Lincoln High School", "Ohio"),
            found("200", "Jefferson MS", "Texas"),
        ];

        let outcome = merge(vec![lincoln()], &batch, &MergeSettings::default());

        assert_eq!(outcome.merged.len(), 2);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.merged[0], lincoln());
        let added = &outcome.new_records()[0];
        assert_eq!(added.record_id, "200");
        assert_eq!(added.state.as_deref(), Some("Texas"));
    }

    #[test]
    fn merging_the_same_batch_twice_adds_nothing() {
        let batch = vec![found("200", "Jefferson MS", "Texas")];
        let settings = MergeSettings::default();

        let first = merge(vec![lincoln()], &batch, &settings);
        let second = merge(first.merged.clone(), &batch, &settings);

        assert_eq!(second.added, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.merged, first.merged);
    }

    #[test]
    fn duplicates_inside_the_batch_keep_the_first() {
        let batch = vec![
            found("300", "Adams Elementary", "Iowa"),
            found(" 300 ", "Adams Elementary Annex", "Kansas"),
        ];

        let outcome = merge(Vec::new(), &batch, &MergeSettings::default());

        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.merged[0].state.as_deref(), Some("Iowa"));
    }

    #[test]
    fn blank_keys_and_missing_locations_are_rejected() {
        let failed = GeocodeResult::failure(
            &InputRecord {
                record_id: "400".to_string(),
                name: "Nowhere Academy".to_string(),
                ..InputRecord::default()
            },
            1,
            FailureKind::NotFound,
        );
        let batch = vec![found("  ", "Blank Id School", "Utah"), failed];

        let outcome = merge(vec![lincoln()], &batch, &MergeSettings::default());

        assert_eq!(outcome.rejected, 2);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.merged.len(), 1);
    }

    #[test]
    fn duplicate_dataset_keys_are_collapsed() {
        let outcome = merge(vec![lincoln(), lincoln()], &[], &MergeSettings::default());

        assert_eq!(outcome.collapsed, 1);
        assert_eq!(outcome.previous, 1);
        assert_eq!(outcome.merged.len(), 1);
    }

    #[test]
    fn top_states_rank_by_count_then_name() {
        let mut records = vec![lincoln(), lincoln(), CanonicalRecord::new("5", "No State")];
        records.push(CanonicalRecord {
            state: Some("Alaska".to_string()),
            ..CanonicalRecord::new("6", "Juneau SD")
        });

        let ranked = top_states(&records, 10);
        assert_eq!(
            ranked,
            vec![
                ("Ohio".to_string(), 2),
                ("Alaska".to_string(), 1),
                ("Unknown".to_string(), 1),
            ]
        );
        assert_eq!(top_states(&records, 1).len(), 1);
    }
}
