#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Record shapes shared across the organization map pipeline.
//!
//! A row moves through three shapes on its way to the map:
//!
//! 1. [`InputRecord`]: one row of a CRM or spreadsheet export after the
//!    [`fields::FieldMapping`] table has picked out the logical fields.
//! 2. [`GeocodeResult`]: the outcome of geocoding that row, accumulated in
//!    the checkpoint and the [`BatchSummary`] file.
//! 3. [`canonical::CanonicalRecord`]: the de-duplicated dataset entry the
//!    map reads, keyed by `recordId`.

pub mod canonical;
pub mod fields;
pub mod persist;

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A latitude/longitude pair (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

/// One row from a source extract, after field mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Stable external identifier (CRM record ID).
    pub record_id: String,
    /// Organization display name.
    pub name: String,
    /// Web domain, e.g. `springfield.k12.il.us`.
    pub domain: Option<String>,
    /// City, when the source carries one.
    pub city: Option<String>,
    /// State (name or two-letter code), when the source carries one.
    pub state: Option<String>,
    /// ZIP code fragment.
    pub zip: Option<String>,
    /// Website URL, normalized to include a scheme.
    pub website: Option<String>,
}

/// Why a record ended up in the failure list.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// The record did not carry enough information to build a query.
    InsufficientData,
    /// The geocoding service answered, but no query variant matched.
    NotFound,
    /// The geocoding service could not be reached after all retries.
    Unavailable,
}

impl FailureKind {
    /// Human-readable reason stored in the `error` field of a result.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::InsufficientData => "Insufficient data to build search query",
            Self::NotFound => "No geocoding results found",
            Self::Unavailable => "Geocoding service unavailable",
        }
    }
}

/// A resolved location as stored in checkpoint and batch files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedLocation {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Formatted display name returned by the geocoder.
    #[serde(default)]
    pub display_name: String,
    /// Structured address components (`city`, `town`, `neighbourhood`,
    /// `state`, ...).
    #[serde(default)]
    pub address: BTreeMap<String, String>,
    /// The query variant that produced this match.
    #[serde(default)]
    pub query_used: String,
    /// Whether the match came from the address cache.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub from_cache: bool,
}

impl GeocodedLocation {
    /// The location's coordinates.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.latitude,
            lng: self.longitude,
        }
    }
}

/// Outcome of geocoding one [`InputRecord`].
///
/// Successes and failures share a shape so both lists in the checkpoint
/// and batch files read the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    /// Identity key of the source record.
    pub record_id: String,
    /// Organization name as it appeared in the source.
    pub company_name: String,
    /// Absolute row index in the source extract.
    pub index: u64,
    /// When the row was processed (RFC 3339; older files may carry naive
    /// local timestamps).
    pub processed_at: String,
    /// Whether a location was found.
    pub geocoded: bool,
    /// Failure reason, `None` on success.
    pub error: Option<String>,
    /// Failure classification, `None` on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    /// Resolved location, `None` on failure.
    pub location: Option<GeocodedLocation>,
    /// Source domain (empty when absent).
    #[serde(default)]
    pub domain: String,
    /// City the source already knew about (empty when absent).
    #[serde(default)]
    pub existing_city: String,
    /// ZIP the source already knew about (empty when absent).
    #[serde(default)]
    pub existing_zip: String,
}

impl GeocodeResult {
    fn base(record: &InputRecord, index: u64) -> Self {
        Self {
            record_id: record.record_id.clone(),
            company_name: record.name.clone(),
            index,
            processed_at: Utc::now().to_rfc3339(),
            geocoded: false,
            error: None,
            error_kind: None,
            location: None,
            domain: record.domain.clone().unwrap_or_default(),
            existing_city: record.city.clone().unwrap_or_default(),
            existing_zip: record.zip.clone().unwrap_or_default(),
        }
    }

    /// Builds a successful result for `record` at source row `index`.
    #[must_use]
    pub fn success(record: &InputRecord, index: u64, location: GeocodedLocation) -> Self {
        Self {
            geocoded: true,
            location: Some(location),
            ..Self::base(record, index)
        }
    }

    /// Builds a failed result for `record` at source row `index`.
    #[must_use]
    pub fn failure(record: &InputRecord, index: u64, kind: FailureKind) -> Self {
        Self {
            error: Some(kind.reason().to_string()),
            error_kind: Some(kind),
            ..Self::base(record, index)
        }
    }

    /// Whether this result carries a usable location.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.geocoded && self.location.is_some()
    }
}

/// Percentage of successes among all processed rows.
///
/// Returns `0.0` when nothing has been processed yet.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn success_rate(successes: usize, failures: usize) -> f64 {
    let total = successes + failures;
    if total == 0 {
        return 0.0;
    }
    successes as f64 / total as f64 * 100.0
}

/// Aggregate statistics written at the top of a batch file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    /// When the batch was finalized (RFC 3339).
    pub processed_at: String,
    /// Number of successful geocodes.
    pub total_results: u64,
    /// Number of failed rows.
    pub total_errors: u64,
    /// `total_results / (total_results + total_errors) * 100`.
    pub success_rate: f64,
    /// Rows skipped before this system took over.
    pub skipped_rows: u64,
    /// Index of the next unprocessed source row.
    pub last_processed_index: u64,
}

/// The batch summary artifact produced when a geocoding run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Aggregate statistics.
    pub metadata: BatchMetadata,
    /// Every successful result, in processing order.
    #[serde(default)]
    pub successful_geocodes: Vec<GeocodeResult>,
    /// Every failed result, in processing order.
    #[serde(default)]
    pub failed_geocodes: Vec<GeocodeResult>,
}

impl BatchSummary {
    /// Assembles a summary from accumulated results.
    #[must_use]
    pub fn new(
        successful_geocodes: Vec<GeocodeResult>,
        failed_geocodes: Vec<GeocodeResult>,
        skipped_rows: u64,
        last_processed_index: u64,
    ) -> Self {
        let metadata = BatchMetadata {
            processed_at: Utc::now().to_rfc3339(),
            total_results: successful_geocodes.len() as u64,
            total_errors: failed_geocodes.len() as u64,
            success_rate: success_rate(successful_geocodes.len(), failed_geocodes.len()),
            skipped_rows,
            last_processed_index,
        };
        Self {
            metadata,
            successful_geocodes,
            failed_geocodes,
        }
    }
}
