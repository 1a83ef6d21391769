//! Pipeline configuration loaded from `org_map.toml`.
//!
//! Every field has a default, so an empty or missing file is a valid
//! configuration. CLI flags override individual values after loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use org_map_geocoder::client::ClientSettings;
use org_map_records_models::canonical::MergeSettings;
use org_map_records_models::fields::FieldMapping;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::DriverOptions;

/// Config file picked up from the working directory when `--config` is not
/// given.
pub const DEFAULT_CONFIG_FILE: &str = "org_map.toml";

/// Errors from loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid configuration TOML.
    #[error("Invalid config {path}: {source}")]
    Parse {
        /// Config path.
        path: PathBuf,
        /// TOML error.
        source: toml::de::Error,
    },
}

/// All tunables for a geocode + merge run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Checkpoint log path.
    pub checkpoint_path: PathBuf,
    /// Address cache path.
    pub cache_path: PathBuf,
    /// Batch summary written when a run completes.
    pub batch_path: PathBuf,
    /// Canonical dataset the batch is merged into.
    pub dataset_path: PathBuf,
    /// Source rows to skip when no checkpoint exists.
    pub skip_rows: u64,
    /// Save the checkpoint and cache every N processed rows.
    pub save_every: u64,
    /// Log a status line every N processed rows.
    pub status_every: u64,
    /// Minimum milliseconds between geocoder requests.
    pub rate_limit_ms: u64,
    /// Attempts per query variant.
    pub max_retries: u32,
    /// First retry delay in milliseconds; doubles per attempt.
    pub backoff_base_ms: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Source column mapping.
    pub fields: FieldMapping,
    /// Batch → canonical conversion settings.
    pub merge: MergeSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: PathBuf::from("geocoding_progress.json"),
            cache_path: PathBuf::from("geocode_cache.json"),
            batch_path: PathBuf::from("geocoded-batch.json"),
            dataset_path: PathBuf::from("geocoded-current.json"),
            skip_rows: 0,
            save_every: 100,
            status_every: 10,
            rate_limit_ms: 1000,
            max_retries: 3,
            backoff_base_ms: 1000,
            request_timeout_secs: 30,
            fields: FieldMapping::default(),
            merge: MergeSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads the configuration.
    ///
    /// With `Some(path)` the file must exist. With `None`,
    /// [`DEFAULT_CONFIG_FILE`] is read if present and defaults are used
    /// otherwise.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Read`] if the file cannot be read
    /// * [`ConfigError::Parse`] if it is not valid configuration TOML
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    log::debug!("No {DEFAULT_CONFIG_FILE} found; using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses configuration TOML.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if `text` is not valid configuration.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::de::from_str(text)
    }

    /// Geocoding client pacing and retry settings.
    #[must_use]
    pub const fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            rate_limit: Duration::from_millis(self.rate_limit_ms),
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
        }
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Batch driver cadence and output settings.
    #[must_use]
    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            save_every: self.save_every.max(1),
            status_every: self.status_every.max(1),
            skip_rows: self.skip_rows,
            batch_path: self.batch_path.clone(),
        }
    }
}
