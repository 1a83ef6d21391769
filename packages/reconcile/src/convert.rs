//! Conversion from batch geocode results to canonical records.

use org_map_records_models::canonical::{CanonicalRecord, MergeSettings, Products};
use org_map_records_models::{GeocodeResult, GeocodedLocation};
use serde_json::Number;
use strum_macros::{AsRefStr, Display, EnumString};

/// Organization type inferred from a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum OrgType {
    District,
    Charter,
    Private,
    #[strum(serialize = "ESC")]
    Esc,
    #[strum(serialize = "CMO")]
    Cmo,
}

const PRIVATE_WORDS: &[&str] = &[
    "catholic",
    "christian",
    "episcopal",
    "methodist",
    "baptist",
    "lutheran",
    "parish",
    "academy",
    "preparatory",
    "prep",
];

const DISTRICT_WORDS: &[&str] = &["district", "unified", "public", "isd", "usd", "csd"];

/// Infers the organization type from explicit indicators in `name`.
///
/// Returns `None` when the name carries no indicator.
#[must_use]
pub fn classify_org_type(name: &str) -> Option<OrgType> {
    let lower = name.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |candidates: &[&str]| words.iter().any(|w| candidates.contains(w));
    let is_district = has(DISTRICT_WORDS);

    if has(&["cmo"]) || lower.contains("charter management") {
        Some(OrgType::Cmo)
    } else if has(&["esc"]) || lower.contains("educational service") {
        Some(OrgType::Esc)
    } else if has(PRIVATE_WORDS) && !is_district {
        Some(OrgType::Private)
    } else if has(&["charter"]) && !is_district {
        Some(OrgType::Charter)
    } else if is_district {
        Some(OrgType::District)
    } else {
        None
    }
}

/// Picks the city: the first non-empty address component in
/// `city_priority`, then the record's previously known city.
#[must_use]
pub fn pick_city(
    result: &GeocodeResult,
    location: &GeocodedLocation,
    city_priority: &[String],
) -> Option<String> {
    city_priority
        .iter()
        .filter_map(|key| location.address.get(key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .or_else(|| Some(result.existing_city.trim()).filter(|c| !c.is_empty()))
        .map(String::from)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Builds the canonical record for a successful batch result.
///
/// Coordinates are copied unchanged; owner, revenue, and headcount get
/// neutral placeholders from `settings`.
#[must_use]
pub fn convert(
    result: &GeocodeResult,
    location: &GeocodedLocation,
    settings: &MergeSettings,
) -> CanonicalRecord {
    let customer_type = classify_org_type(&result.company_name)
        .map_or_else(|| settings.customer_type.clone(), |t| t.to_string());

    CanonicalRecord {
        competitor: Some(settings.competitor.clone()),
        domain: non_empty(&result.domain),
        city: pick_city(result, location, &settings.city_priority),
        state: location.address.get("state").and_then(|s| non_empty(s)),
        owner: Some(settings.owner.clone()),
        create_date: non_empty(&result.processed_at),
        lat: Some(location.latitude),
        lng: Some(location.longitude),
        record_type: Some(settings.record_type.clone()),
        products: Some(Products::List(settings.products.clone())),
        customer_type: Some(customer_type),
        arr: Some(Number::from(settings.arr)),
        employees: Some(Number::from(settings.employees)),
        last_contact: non_empty(&result.processed_at),
        sales_stage: Some(settings.sales_stage.clone()),
        priority: Some(settings.priority.clone()),
        ..CanonicalRecord::new(result.record_id.trim(), result.company_name.trim())
    }
}
