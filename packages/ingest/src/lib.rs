#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resumable batch geocoding of organization records.
//!
//! A run reads a source extract, resumes from the checkpoint index, and
//! geocodes one row at a time through the shared address cache. Progress is
//! saved periodically and always on exit, so an interrupted run continues
//! exactly where it stopped. A completed run writes the batch summary that
//! the reconciler merges into the canonical dataset.

pub mod checkpoint;
pub mod config;
pub mod csv_source;
pub mod driver;
pub mod progress;
pub mod shutdown;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use org_map_geocoder::cache::{AddressCache, CacheError};
use org_map_geocoder::client::{GeocodingClient, NominatimBackend};
use org_map_geocoder::{GeocodeError, service_registry};
use thiserror::Error;

use crate::checkpoint::{CheckpointError, ProgressStore};
use crate::config::{ConfigError, PipelineConfig};
use crate::csv_source::SourceError;
use crate::driver::{BatchDriver, RunReport};
use crate::progress::ProgressCallback;
use crate::shutdown::ShutdownSignal;

/// Errors that abort a batch run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The source extract could not be read.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The checkpoint could not be persisted.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// The address cache could not be persisted.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The geocoding client could not be built.
    #[error("Failed to set up geocoder: {0}")]
    Geocoder(#[from] GeocodeError),

    /// No enabled geocoding service is configured.
    #[error("No enabled geocoding service")]
    NoService,

    /// The batch summary could not be written.
    #[error("Failed to write batch summary {path}: {source}")]
    Summary {
        /// Summary path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Geocodes the CSV extract at `input` with the primary Nominatim service.
///
/// # Errors
///
/// Returns [`PipelineError`] if the extract cannot be read, the geocoder
/// cannot be set up, or progress cannot be persisted.
pub async fn geocode_file(
    config: &PipelineConfig,
    input: &Path,
    shutdown: ShutdownSignal,
    progress: Arc<dyn ProgressCallback>,
) -> Result<RunReport, PipelineError> {
    let records = csv_source::load_records(input, &config.fields)?;

    let service = service_registry::primary_service().ok_or(PipelineError::NoService)?;
    log::info!("Geocoding with {} at {}", service.name, service.base_url());
    if config.rate_limit_ms < service.rate_limit_ms() {
        log::warn!(
            "rate_limit_ms {} is below the {} ms {} asks for",
            config.rate_limit_ms,
            service.rate_limit_ms(),
            service.name
        );
    }
    let backend = NominatimBackend::from_service(&service, config.request_timeout())?;
    let client = GeocodingClient::new(backend, config.client_settings());

    let cache = AddressCache::load(&config.cache_path);
    let store = ProgressStore::open(&config.checkpoint_path, config.skip_rows);

    let mut driver = BatchDriver::new(client, cache, store, config.driver_options(), shutdown)
        .with_progress(progress);
    driver.run(&records).await
}
