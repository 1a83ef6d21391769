//! Search query construction for organization records.
//!
//! School and district names are noisy (`"Euclid City Schools (OH)"`,
//! `"Austin ISD of Travis, TX"`), and the records often lack an explicit
//! city or state. [`build_query`] fills the gaps from the name itself,
//! the web domain, and a small table of well-known cities, then emits
//! candidate query strings from most to least specific.

use std::sync::LazyLock;

use org_map_records_models::InputRecord;
use regex::Regex;
use thiserror::Error;

use crate::states;

/// Names with fewer meaningful characters than this are not searchable.
pub const MIN_NAME_CHARS: usize = 5;

/// Parenthetical annotations such as `"(OH)"` or `"(closed 2019)"`.
static PARENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// `"<name> School District|ISD|USD|CSD [of] <city>[, ST]"`
static DISTRICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^.+?\s+(?:school\s+district|isd|usd|csd)\s+(?:of\s+)?([a-z\s.'-]+?)(?:,\s*(?-i:([A-Z]{2})))?\s*$",
    )
    .expect("valid regex")
});

/// `"<name> Elementary|Middle|High|School(s)[,] <city>[, ST]"`
///
/// The city follows the last level word, so `"High School <city>"` does not
/// capture `"School <city>"`.
static SCHOOL_LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^.+\s+(?:elementary|middle|high|schools?)\b\s*,?\s*([a-z\s.'-]+?)(?:,\s*(?-i:([A-Z]{2})))?\s*$",
    )
    .expect("valid regex")
});

/// `"City of <city> School District|Schools"`
static CITY_OF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcity\s+of\s+([a-z\s.'-]+?)\s+(?:school\s+district|schools?)\b")
        .expect("valid regex")
});

/// A standalone `school`/`schools` word.
static SCHOOL_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+schools?\b").expect("valid regex"));

/// Words that cannot start a city name. Extractions beginning with one of
/// these captured part of the organization name instead.
const NOT_A_CITY: &[&str] = &[
    "city",
    "county",
    "district",
    "elementary",
    "high",
    "isd",
    "middle",
    "parish",
    "public",
    "school",
    "schools",
    "unified",
];

/// Errors from query construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The cleaned name is too short to search for.
    #[error("Insufficient data to build search query for {name:?}")]
    InsufficientData {
        /// The name as it appeared in the record.
        name: String,
    },
}

/// Candidate search strings for one record, most specific first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeQuery {
    /// Ordered, de-duplicated, non-empty query strings.
    pub variants: Vec<String>,
    /// City used in the query, if one was found.
    pub city: Option<String>,
    /// Full state name used in the query, if one was found.
    pub state: Option<String>,
}

/// Strips parenthetical annotations and collapses whitespace.
#[must_use]
pub fn clean_name(raw: &str) -> String {
    let without_parens = PARENS_RE.replace_all(raw, " ");
    WHITESPACE_RE
        .replace_all(&without_parens, " ")
        .trim()
        .to_string()
}

/// City and optional two-letter state code embedded in an organization
/// name.
#[must_use]
pub fn extract_location(name: &str) -> Option<(String, Option<String>)> {
    [&*DISTRICT_RE, &*SCHOOL_LEVEL_RE, &*CITY_OF_RE]
        .into_iter()
        .filter_map(|re| re.captures(name))
        .find_map(|caps| {
            let city = caps.get(1)?.as_str().trim();
            let first_word = city.split_whitespace().next()?.to_lowercase();
            if NOT_A_CITY.contains(&first_word.as_str()) {
                return None;
            }
            let state = caps.get(2).map(|m| m.as_str().to_string());
            Some((city.to_string(), state))
        })
}

/// Builds the ordered query variants for `record`.
///
/// # Errors
///
/// Returns [`QueryError::InsufficientData`] if the cleaned name has fewer
/// than [`MIN_NAME_CHARS`] alphanumeric characters.
pub fn build_query(record: &InputRecord) -> Result<GeocodeQuery, QueryError> {
    let name = clean_name(&record.name);
    if name.chars().filter(|c| c.is_alphanumeric()).count() < MIN_NAME_CHARS {
        return Err(QueryError::InsufficientData {
            name: record.name.clone(),
        });
    }

    let extracted = extract_location(&name);
    let city = record
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .or_else(|| extracted.as_ref().map(|(city, _)| city.clone()));

    let state = record
        .domain
        .as_deref()
        .and_then(states::state_from_domain)
        .map(String::from)
        .or_else(|| {
            extracted
                .as_ref()
                .and_then(|(_, code)| code.as_deref())
                .map(states::normalize_state)
        })
        .or_else(|| {
            city.as_deref()
                .and_then(states::state_for_city)
                .map(String::from)
        })
        .or_else(|| {
            record
                .state
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(states::normalize_state)
        });

    let mut parts = vec![name.as_str()];
    parts.extend(city.as_deref());
    parts.extend(state.as_deref());
    let located = parts.join(", ");

    let without_school_word = WHITESPACE_RE
        .replace_all(&SCHOOL_WORD_RE.replace_all(&located, ""), " ")
        .trim()
        .to_string();

    let mut variants: Vec<String> = Vec::with_capacity(3);
    for candidate in [format!("{located}, school"), located, without_school_word] {
        let candidate = candidate.trim().trim_matches(',').trim().to_string();
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }

    Ok(GeocodeQuery {
        variants,
        city,
        state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> InputRecord {
        InputRecord {
            record_id: "1".to_string(),
            name: name.to_string(),
            ..InputRecord::default()
        }
    }

    #[test]
    fn district_with_k12_domain() {
        let mut input = record("Springfield Unified School District");
        input.domain = Some("springfield.k12.il.us".to_string());

        let query = build_query(&input).unwrap();
        let first = &query.variants[0];
        assert!(first.contains("Springfield Unified School District"));
        assert!(first.contains("Illinois"));
        assert!(first.ends_with("school"));
        assert_eq!(query.state.as_deref(), Some("Illinois"));
        assert_eq!(query.city, None);
    }

    #[test]
    fn variants_weaken_in_order() {
        let mut input = record("Lincoln High School");
        input.city = Some("Euclid".to_string());

        let query = build_query(&input).unwrap();
        assert_eq!(
            query.variants,
            vec![
                "Lincoln High School, Euclid, Ohio, school".to_string(),
                "Lincoln High School, Euclid, Ohio".to_string(),
                "Lincoln High, Euclid, Ohio".to_string(),
            ]
        );
    }

    #[test]
    fn duplicate_variants_are_dropped() {
        let query = build_query(&record("Jefferson Academy")).unwrap();
        assert_eq!(
            query.variants,
            vec![
                "Jefferson Academy, school".to_string(),
                "Jefferson Academy".to_string(),
            ]
        );
    }

    #[test]
    fn short_names_are_insufficient() {
        assert_eq!(
            build_query(&record("  (TBD) AB ")),
            Err(QueryError::InsufficientData {
                name: "  (TBD) AB ".to_string()
            })
        );
        assert!(build_query(&record("")).is_err());
    }

    #[test]
    fn cleans_parentheticals_and_whitespace() {
        assert_eq!(
            clean_name("Euclid   City Schools (OH)  (formerly Euclid SD)"),
            "Euclid City Schools"
        );
    }

    #[test]
    fn extracts_city_and_state_from_names() {
        assert_eq!(
            extract_location("Austin ISD of Travis, TX"),
            Some(("Travis".to_string(), Some("TX".to_string())))
        );
        assert_eq!(
            extract_location("Lincoln Elementary Dayton, OH"),
            Some(("Dayton".to_string(), Some("OH".to_string())))
        );
        assert_eq!(
            extract_location("City of Euclid Schools"),
            Some(("Euclid".to_string(), None))
        );
        assert_eq!(extract_location("Mesa Public Schools"), None);
        assert_eq!(extract_location("Springfield Unified School District"), None);
    }

    #[test]
    fn city_follows_the_last_level_word() {
        assert_eq!(
            extract_location("Washington High School Marietta"),
            Some(("Marietta".to_string(), None))
        );
        assert_eq!(
            extract_location("Lincoln Middle School, Canton, OH"),
            Some(("Canton".to_string(), Some("OH".to_string())))
        );
        assert_eq!(extract_location("Lincoln High School"), None);
        assert_eq!(extract_location("Westerville North High"), None);

        let query = build_query(&record("Washington High School Marietta")).unwrap();
        assert_eq!(query.city.as_deref(), Some("Marietta"));
    }

    #[test]
    fn name_state_code_becomes_full_name() {
        let query = build_query(&record("Lincoln Elementary Dayton, OH")).unwrap();
        assert_eq!(query.city.as_deref(), Some("Dayton"));
        assert_eq!(query.state.as_deref(), Some("Ohio"));
    }

    #[test]
    fn explicit_state_is_the_last_resort() {
        let mut input = record("Boise Christian Academy");
        input.state = Some("ID".to_string());
        let query = build_query(&input).unwrap();
        assert_eq!(query.state.as_deref(), Some("Idaho"));

        input.domain = Some("bca.k12.wa.us".to_string());
        let query = build_query(&input).unwrap();
        assert_eq!(query.state.as_deref(), Some("Washington"));
    }
}
