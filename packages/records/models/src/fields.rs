//! Column-name mapping from raw export rows to [`InputRecord`]s.
//!
//! CRM and spreadsheet exports name the same field differently
//! (`Company name`, `School Name`, `School or District Name`, ...). The
//! [`FieldMapping`] table lists, per logical field, the acceptable source
//! column names in the order they should be tried. The first non-blank
//! value wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::InputRecord;

/// A raw row: source column name → cell text.
pub type RawRow = BTreeMap<String, String>;

/// Cell values that exports use to mean "empty".
const BLANK_MARKERS: &[&str] = &["nan", "none", "null", "n/a"];

/// Logical field → ordered list of acceptable source column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    /// Identity key columns.
    pub record_id: Vec<String>,
    /// Display name columns.
    pub name: Vec<String>,
    /// Domain columns.
    pub domain: Vec<String>,
    /// City columns.
    pub city: Vec<String>,
    /// State columns.
    pub state: Vec<String>,
    /// ZIP columns.
    pub zip: Vec<String>,
    /// Website columns.
    pub website: Vec<String>,
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            record_id: columns(&["Record ID", "record_id", "recordId"]),
            name: columns(&[
                "Company name",
                "School Name",
                "School or District Name",
                "name",
            ]),
            domain: columns(&["Company Domain Name", "Domain", "domain"]),
            city: columns(&["City", "Agile Location City", "City Address"]),
            state: columns(&["State", "STATE", "State/Region"]),
            zip: columns(&["Agile Location Zip", "Zip", "Zip Address"]),
            website: columns(&["Website", "website"]),
        }
    }
}

impl FieldMapping {
    /// Resolves every logical field of `row` into an [`InputRecord`].
    #[must_use]
    pub fn resolve(&self, row: &RawRow) -> InputRecord {
        InputRecord {
            record_id: first_value(row, &self.record_id).unwrap_or_default(),
            name: first_value(row, &self.name).unwrap_or_default(),
            domain: first_value(row, &self.domain),
            city: first_value(row, &self.city),
            state: first_value(row, &self.state),
            zip: first_value(row, &self.zip),
            website: first_value(row, &self.website).map(|w| normalize_website(&w)),
        }
    }
}

/// Returns the first non-blank cell among `candidates`, trimmed.
fn first_value(row: &RawRow, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|column| row.get(column))
        .map(|value| value.trim())
        .find(|value| !is_blank(value))
        .map(String::from)
}

fn is_blank(value: &str) -> bool {
    value.is_empty()
        || BLANK_MARKERS
            .iter()
            .any(|marker| value.eq_ignore_ascii_case(marker))
}

/// Prefixes `https://` onto websites that lack a scheme.
#[must_use]
pub fn normalize_website(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}
