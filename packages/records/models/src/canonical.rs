//! The canonical dataset record and the defaults used when converting
//! geocode results into it.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Product ownership as it appears in the dataset.
///
/// Older records carry a list of product names; newer ones a map of
/// product flags. Anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Products {
    /// `["CMS", "Mobile App"]`
    List(Vec<String>),
    /// `{"cms": true, "app": false}`
    Flags(BTreeMap<String, bool>),
    /// Unrecognized shape.
    Other(Value),
}

/// One entry of the canonical dataset, keyed by `recordId`.
///
/// Fields this crate does not know about are collected into
/// [`CanonicalRecord::extra`] and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub record_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Products>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arr: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employees: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Fields not modelled above, preserved on rewrite.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanonicalRecord {
    /// The identity key used for de-duplication.
    #[must_use]
    pub fn identity_key(&self) -> &str {
        &self.record_id
    }

    /// Minimal record with only an identity and a name.
    #[must_use]
    pub fn new(record_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            name: name.into(),
            competitor: None,
            domain: None,
            city: None,
            state: None,
            owner: None,
            create_date: None,
            lat: None,
            lng: None,
            record_type: None,
            products: None,
            customer_type: None,
            arr: None,
            employees: None,
            last_contact: None,
            sales_stage: None,
            priority: None,
            extra: Map::new(),
        }
    }
}

// CRM exports sometimes store the record ID as a JSON number.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "recordId must be a string or number, got {other}"
        ))),
    }
}

/// Address component keys tried, in order, when picking a record's city.
fn default_city_priority() -> Vec<String> {
    ["neighbourhood", "town", "city"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

/// How geocode results become [`CanonicalRecord`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Address component keys tried, in order, for the city. The record's
    /// previously known city is the final fallback.
    pub city_priority: Vec<String>,
    /// Competitor name stamped on converted records.
    pub competitor: String,
    /// `type` of converted records.
    pub record_type: String,
    /// Products assigned to converted records.
    pub products: Vec<String>,
    /// Owner placeholder.
    pub owner: String,
    /// Sales stage of converted records.
    pub sales_stage: String,
    /// Priority of converted records.
    pub priority: String,
    /// Customer type when the name carries no organization indicator.
    pub customer_type: String,
    /// Revenue placeholder.
    pub arr: u64,
    /// Employee count placeholder.
    pub employees: u64,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            city_priority: default_city_priority(),
            competitor: "Apptegy".to_string(),
            record_type: "competitor".to_string(),
            products: vec!["CMS".to_string()],
            owner: "Unknown".to_string(),
            sales_stage: "Competitor".to_string(),
            priority: "Medium".to_string(),
            customer_type: "District".to_string(),
            arr: 0,
            employees: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_survive_a_rewrite() {
        let json = r#"{
            "recordId": "100",
            "name": "Lincoln HS",
            "state": "Ohio",
            "products": {"cms": true, "app": false},
            "hubspotOwnerId": 9981,
            "notes": ["renewal"]
        }"#;
        let record: CanonicalRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.identity_key(), "100");
        assert_eq!(record.extra.len(), 2);
        assert!(matches!(record.products, Some(Products::Flags(_))));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["hubspotOwnerId"], 9981);
        assert_eq!(back["notes"][0], "renewal");
        assert!(back.get("lat").is_none());
    }

    #[test]
    fn numeric_record_ids_become_strings() {
        let record: CanonicalRecord =
            serde_json::from_str(r#"{"recordId": 5512, "name": "Euclid City Schools"}"#).unwrap();
        assert_eq!(record.record_id, "5512");
    }

    #[test]
    fn type_field_uses_its_json_name() {
        let mut record = CanonicalRecord::new("7", "Dayton Public Schools");
        record.record_type = Some("customer".to_string());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "customer");
        assert_eq!(json["recordId"], "7");
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let settings: MergeSettings =
            serde_json::from_str(r#"{"city_priority": ["city"]}"#).unwrap();
        assert_eq!(settings.city_priority, vec!["city".to_string()]);
        assert_eq!(settings.owner, "Unknown");
        assert_eq!(settings.products, vec!["CMS".to_string()]);
    }
}
