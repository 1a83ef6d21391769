//! Compile-time registry of geocoding service configurations.
//!
//! Each provider is defined in a TOML file under `services/`. The registry
//! embeds these at compile time and exposes them via [`all_services`],
//! [`enabled_services`], and [`primary_service`].

use serde::Deserialize;

/// Environment variable that overrides the primary service's base URL
/// (self-hosted Nominatim, test servers).
pub const BASE_URL_ENV: &str = "ORG_MAP_GEOCODER_URL";

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service may be used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Selection order; lower values are preferred.
    pub priority: u32,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim / `OpenStreetMap` search API.
    Nominatim {
        /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
        base_url: String,
        /// Minimum delay between requests in milliseconds.
        rate_limit_ms: u64,
        /// `User-Agent` header sent with every request.
        user_agent: String,
    },
}

const fn default_true() -> bool {
    true
}

impl GeocodingService {
    /// Returns the provider's base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim { base_url, .. } => base_url,
        }
    }

    /// The provider's advertised minimum delay between requests.
    #[must_use]
    pub const fn rate_limit_ms(&self) -> u64 {
        match &self.provider {
            ProviderConfig::Nominatim { rate_limit_ms, .. } => *rate_limit_ms,
        }
    }

    /// Replaces the base URL, e.g. with an environment override.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        match &mut self.provider {
            ProviderConfig::Nominatim { base_url, .. } => *base_url = url.into(),
        }
        self
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[("nominatim", include_str!("../services/nominatim.toml"))];

/// Returns all geocoding service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<GeocodingService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse geocoding service '{name}': {e}"))
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
#[must_use]
pub fn enabled_services() -> Vec<GeocodingService> {
    let mut services: Vec<GeocodingService> =
        all_services().into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    services
}

/// The highest-priority enabled service, with [`BASE_URL_ENV`] applied.
#[must_use]
pub fn primary_service() -> Option<GeocodingService> {
    let service = enabled_services().into_iter().next()?;
    Some(apply_override(service, std::env::var(BASE_URL_ENV).ok()))
}

fn apply_override(service: GeocodingService, url: Option<String>) -> GeocodingService {
    match url.filter(|u| !u.trim().is_empty()) {
        Some(url) => {
            log::info!("Using geocoder URL from {BASE_URL_ENV}: {url}");
            service.with_base_url(url.trim())
        }
        None => service,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_services() {
        assert_eq!(all_services().len(), SERVICE_TOMLS.len());
    }

    #[test]
    fn service_ids_are_unique() {
        let services = all_services();
        let mut seen = BTreeSet::new();
        for svc in &services {
            assert!(seen.insert(&svc.id), "Duplicate service ID: {}", svc.id);
        }
    }

    #[test]
    fn nominatim_is_primary_and_polite() {
        let svc = enabled_services().into_iter().next().unwrap();
        assert_eq!(svc.id, "nominatim");
        assert!(svc.base_url().starts_with("https://"));
        assert!(svc.rate_limit_ms() >= 1000);
        let ProviderConfig::Nominatim { user_agent, .. } = &svc.provider;
        assert!(!user_agent.is_empty());
    }

    #[test]
    fn override_replaces_base_url() {
        let svc = all_services().remove(0);
        let svc = apply_override(svc, Some(" http://localhost:8080/search ".to_string()));
        assert_eq!(svc.base_url(), "http://localhost:8080/search");

        let svc = apply_override(svc, Some(String::new()));
        assert_eq!(svc.base_url(), "http://localhost:8080/search");
    }
}
