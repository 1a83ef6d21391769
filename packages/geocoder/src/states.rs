//! US state lookup tables.
//!
//! Public-sector domains encode the state in the host name
//! (`springfield.k12.il.us`, `dayton.oh.us`), and a handful of large
//! cities are unambiguous enough to imply their state.

/// Two-letter postal code → full state name.
const STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

/// Cities whose state is unambiguous for this dataset.
const CITY_STATES: &[(&str, &str)] = &[
    ("euclid", "Ohio"),
    ("cleveland", "Ohio"),
    ("columbus", "Ohio"),
    ("cincinnati", "Ohio"),
    ("toledo", "Ohio"),
    ("akron", "Ohio"),
    ("dayton", "Ohio"),
    ("houston", "Texas"),
    ("dallas", "Texas"),
    ("austin", "Texas"),
    ("san antonio", "Texas"),
    ("fort worth", "Texas"),
    ("los angeles", "California"),
    ("san francisco", "California"),
    ("san diego", "California"),
    ("sacramento", "California"),
    ("fresno", "California"),
    ("chicago", "Illinois"),
    ("springfield", "Illinois"),
    ("peoria", "Illinois"),
    ("rockford", "Illinois"),
    ("phoenix", "Arizona"),
    ("tucson", "Arizona"),
    ("mesa", "Arizona"),
    ("atlanta", "Georgia"),
    ("savannah", "Georgia"),
    ("augusta", "Georgia"),
    ("miami", "Florida"),
    ("tampa", "Florida"),
    ("orlando", "Florida"),
    ("jacksonville", "Florida"),
    ("tallahassee", "Florida"),
];

/// Full state name for a two-letter code (case-insensitive).
#[must_use]
pub fn state_name(code: &str) -> Option<&'static str> {
    let code = code.trim();
    STATES
        .iter()
        .find(|(abbr, _)| abbr.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

/// Normalizes a free-text state (code or name) to its full name.
///
/// Unrecognized values are returned trimmed, as given.
#[must_use]
pub fn normalize_state(raw: &str) -> String {
    let raw = raw.trim();
    if let Some(name) = state_name(raw) {
        return name.to_string();
    }
    STATES
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(raw))
        .map_or_else(|| raw.to_string(), |(_, name)| (*name).to_string())
}

/// State implied by a `.us` public-sector domain.
///
/// Matches both `<x>.k12.<st>.us` and `<x>.<st>.us`. A scheme, path, or
/// trailing dot is tolerated.
#[must_use]
pub fn state_from_domain(domain: &str) -> Option<&'static str> {
    let host = domain.trim();
    let host = host.split_once("://").map_or(host, |(_, rest)| rest);
    let host = host.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.trim_end_matches('.');

    let mut labels = host.rsplit('.');
    if !labels.next()?.eq_ignore_ascii_case("us") {
        return None;
    }
    let state = labels.next()?;
    // Require at least one label before the state.
    labels.next()?;
    state_name(state)
}

/// State for a well-known city name (case-insensitive).
#[must_use]
pub fn state_for_city(city: &str) -> Option<&'static str> {
    let city = city.trim().to_lowercase();
    CITY_STATES
        .iter()
        .find(|(name, _)| *name == city)
        .map(|(_, state)| *state)
}
