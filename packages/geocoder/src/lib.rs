#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding for organization records.
//!
//! Turns loosely structured organization rows into ordered Nominatim
//! queries ([`query`]), resolves them one variant at a time under a rate
//! limit with retry/backoff ([`client`]), and remembers every resolved
//! query string in a persistent JSON [`cache`] so re-runs never hit the
//! network for an address they have already seen.
//!
//! The provider endpoint comes from the embedded [`service_registry`].

pub mod cache;
pub mod client;
pub mod nominatim;
pub mod query;
pub mod service_registry;
pub mod states;

use std::collections::BTreeMap;

use thiserror::Error;

/// A single geocoder match.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// The formatted place name returned by the geocoder.
    pub display_name: Option<String>,
    /// Structured address components (`town`, `city`, `state`, ...).
    pub address: BTreeMap<String, String>,
}

/// Errors from a single geocoding request.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Unexpected HTTP status {status}")]
    Status {
        /// Response status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

impl GeocodeError {
    /// Whether retrying the same request may succeed.
    ///
    /// Client errors other than 429 are permanent.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_builder(),
            Self::Status { status } => *status == 429 || *status >= 500,
            Self::Parse { .. } | Self::RateLimited => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_permanent() {
        assert!(!GeocodeError::Status { status: 404 }.is_retryable());
        assert!(!GeocodeError::Status { status: 400 }.is_retryable());
        assert!(GeocodeError::Status { status: 503 }.is_retryable());
        assert!(GeocodeError::Status { status: 429 }.is_retryable());
        assert!(GeocodeError::RateLimited.is_retryable());
        assert!(
            GeocodeError::Parse {
                message: "truncated".to_string()
            }
            .is_retryable()
        );
    }
}
