//! Rate-limited, retrying resolution of query variants.
//!
//! [`GeocodingClient::resolve`] walks a record's query variants in order:
//!
//! 1. Every variant is looked up in the [`AddressCache`] first. A hit on
//!    any of them returns immediately without touching the network.
//! 2. Otherwise each variant is sent to the backend, at most one request
//!    per `rate_limit`, retrying transient failures with exponential
//!    backoff. The first variant with a match wins and is cached.
//!
//! When every variant comes back empty the record is
//! [`ResolveError::NotFound`]; when at least one variant ended in a
//! transport failure and none matched it is [`ResolveError::Unavailable`].

use std::time::Duration;

use async_trait::async_trait;
use org_map_records_models::{FailureKind, GeocodedLocation};
use thiserror::Error;
use tokio::time::Instant;

use crate::cache::{AddressCache, CachedLocation};
use crate::service_registry::{GeocodingService, ProviderConfig};
use crate::{GeocodeError, GeocodedAddress, nominatim};

/// A geocoding provider that answers one free-form query.
#[async_trait]
pub trait GeocodeBackend: Send + Sync {
    /// Returns the best match for `query`, or `None` for a clean empty
    /// answer.
    async fn search(&self, query: &str) -> Result<Option<GeocodedAddress>, GeocodeError>;
}

/// [`GeocodeBackend`] backed by a Nominatim HTTP endpoint.
#[derive(Debug, Clone)]
pub struct NominatimBackend {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimBackend {
    /// Builds a backend with a fixed user agent and per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Builds a backend from a registry entry.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn from_service(service: &GeocodingService, timeout: Duration) -> Result<Self, GeocodeError> {
        let ProviderConfig::Nominatim {
            base_url,
            user_agent,
            ..
        } = &service.provider;
        Self::new(base_url.clone(), user_agent, timeout)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl GeocodeBackend for NominatimBackend {
    async fn search(&self, query: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        nominatim::search(&self.client, &self.base_url, query).await
    }
}

/// Pacing and retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    /// Minimum spacing between consecutive outbound requests.
    pub rate_limit: Duration,
    /// Attempts per variant, including the first.
    pub max_retries: u32,
    /// Backoff before retry `n` is `backoff_base * 2^n`.
    pub backoff_base: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            rate_limit: Duration::from_millis(1000),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// Why a record could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Every variant returned an empty result.
    #[error("No geocoding results found")]
    NotFound,
    /// At least one variant failed in transport and none matched.
    #[error("Geocoding service unavailable: {last_error}")]
    Unavailable {
        /// The last transport error seen.
        last_error: String,
    },
}

impl ResolveError {
    /// The failure classification recorded in results.
    #[must_use]
    pub const fn failure_kind(&self) -> FailureKind {
        match self {
            Self::NotFound => FailureKind::NotFound,
            Self::Unavailable { .. } => FailureKind::Unavailable,
        }
    }
}

/// Resolves query variants through the cache and a [`GeocodeBackend`].
pub struct GeocodingClient<B> {
    backend: B,
    settings: ClientSettings,
    last_request: Option<Instant>,
    requests: u64,
}

impl<B: GeocodeBackend> GeocodingClient<B> {
    #[must_use]
    pub const fn new(backend: B, settings: ClientSettings) -> Self {
        Self {
            backend,
            settings,
            last_request: None,
            requests: 0,
        }
    }

    /// Number of outbound requests issued so far.
    #[must_use]
    pub const fn requests(&self) -> u64 {
        self.requests
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Resolves the first matching variant.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] if every variant came back empty,
    /// or [`ResolveError::Unavailable`] if any variant failed in transport
    /// and none matched.
    pub async fn resolve(
        &mut self,
        variants: &[String],
        cache: &mut AddressCache,
    ) -> Result<GeocodedLocation, ResolveError> {
        for variant in variants {
            if let Some(entry) = cache.get_entry(variant) {
                log::debug!("Cache hit for {variant:?}");
                return Ok(GeocodedLocation {
                    latitude: entry.lat,
                    longitude: entry.lng,
                    display_name: entry.display_name.clone().unwrap_or_default(),
                    address: entry.address.clone(),
                    query_used: variant.clone(),
                    from_cache: true,
                });
            }
        }

        let mut last_error = None;
        for variant in variants {
            match self.lookup_with_retry(variant).await {
                Ok(Some(found)) => {
                    cache.put_entry(
                        variant,
                        CachedLocation {
                            lat: found.latitude,
                            lng: found.longitude,
                            display_name: found.display_name.clone(),
                            address: found.address.clone(),
                        },
                    );
                    return Ok(GeocodedLocation {
                        latitude: found.latitude,
                        longitude: found.longitude,
                        display_name: found.display_name.unwrap_or_default(),
                        address: found.address,
                        query_used: variant.clone(),
                        from_cache: false,
                    });
                }
                Ok(None) => log::debug!("No match for {variant:?}"),
                Err(e) => {
                    log::warn!("Giving up on {variant:?}: {e}");
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(last_error.map_or(ResolveError::NotFound, |last_error| {
            ResolveError::Unavailable { last_error }
        }))
    }

    async fn lookup_with_retry(
        &mut self,
        query: &str,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let attempts = self.settings.max_retries.max(1);
        let mut attempt = 0_u32;
        loop {
            self.throttle().await;
            match self.backend.search(query).await {
                Ok(found) => return Ok(found),
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let delay = self
                        .settings
                        .backoff_base
                        .saturating_mul(1_u32 << attempt.min(16));
                    log::warn!(
                        "Geocode attempt {}/{attempts} for {query:?} failed: {e}; retrying in {delay:?}",
                        attempt + 1,
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Waits until `rate_limit` has passed since the previous request.
    async fn throttle(&mut self) {
        if let Some(last) = self.last_request {
            tokio::time::sleep_until(last + self.settings.rate_limit).await;
        }
        self.last_request = Some(Instant::now());
        self.requests += 1;
    }
}
