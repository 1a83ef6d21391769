//! Persistent query → coordinates cache.
//!
//! Stored as one flat JSON object keyed by the exact query string:
//!
//! ```json
//! { "Lincoln High School, Euclid, Ohio, school": { "lat": 41.59, "lng": -81.52 } }
//! ```
//!
//! The whole file is loaded at start and rewritten (temp file + rename)
//! at every save point. Entries are insert-only: once a query has
//! coordinates they never change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use org_map_records_models::Coordinates;
use org_map_records_models::persist::{read_json, write_json_atomic};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from persisting the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Writing the cache file failed.
    #[error("Failed to write address cache {path}: {source}")]
    Write {
        /// Cache file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// A cached location.
///
/// Only `lat`/`lng` are required; the display name and address components
/// are kept when known so cache hits can still feed city/state downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub address: BTreeMap<String, String>,
}

impl CachedLocation {
    /// The cached coordinates.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

impl From<Coordinates> for CachedLocation {
    fn from(coords: Coordinates) -> Self {
        Self {
            lat: coords.lat,
            lng: coords.lng,
            display_name: None,
            address: BTreeMap::new(),
        }
    }
}

/// In-memory view of the cache file.
#[derive(Debug, Default)]
pub struct AddressCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, CachedLocation>,
    dirty: bool,
}

impl AddressCache {
    /// Loads the cache from `path`.
    ///
    /// A missing file yields an empty cache. An unreadable or corrupt file
    /// is logged and also yields an empty cache; the next [`Self::save`]
    /// replaces it.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let entries = if path.exists() {
            match read_json::<BTreeMap<String, CachedLocation>>(path) {
                Ok(entries) => {
                    log::info!("Loaded {} cached addresses from {}", entries.len(), path.display());
                    entries
                }
                Err(e) => {
                    log::warn!(
                        "Ignoring unreadable address cache {}: {e}; starting empty",
                        path.display()
                    );
                    BTreeMap::new()
                }
            }
        } else {
            log::info!("No address cache at {}; starting empty", path.display());
            BTreeMap::new()
        };

        Self {
            path: Some(path.to_path_buf()),
            entries,
            dirty: false,
        }
    }

    /// A cache with no backing file. [`Self::save`] is a no-op.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Coordinates cached for `query`.
    #[must_use]
    pub fn get(&self, query: &str) -> Option<Coordinates> {
        self.entries.get(query).map(CachedLocation::coordinates)
    }

    /// Full cached entry for `query`.
    #[must_use]
    pub fn get_entry(&self, query: &str) -> Option<&CachedLocation> {
        self.entries.get(query)
    }

    /// Caches `coords` for `query` unless the key already exists.
    ///
    /// Returns whether the entry was inserted.
    pub fn put(&mut self, query: &str, coords: Coordinates) -> bool {
        self.put_entry(query, coords.into())
    }

    /// Caches a full entry for `query` unless the key already exists.
    ///
    /// Returns whether the entry was inserted.
    pub fn put_entry(&mut self, query: &str, entry: CachedLocation) -> bool {
        if self.entries.contains_key(query) {
            return false;
        }
        self.entries.insert(query.to_string(), entry);
        self.dirty = true;
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether entries were added since the last save.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rewrites the cache file if anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Write`] if the file cannot be written. The
    /// previous file is left intact in that case.
    pub fn save(&mut self) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        write_json_atomic(path, &self.entries).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;
        self.dirty = false;
        log::debug!("Saved {} cached addresses to {}", self.entries.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const EUCLID: Coordinates = Coordinates {
        lat: 41.5931,
        lng: -81.5268,
    };

    #[test]
    fn put_never_overwrites() {
        let mut cache = AddressCache::in_memory();
        assert!(cache.put("Euclid High School", EUCLID));
        assert!(!cache.put(
            "Euclid High School",
            Coordinates { lat: 0.0, lng: 0.0 }
        ));
        assert_eq!(cache.get("Euclid High School"), Some(EUCLID));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn save_and_reload() {
        let tmp = std::env::temp_dir().join("org_map_cache_save_reload");
        let _ = fs::remove_dir_all(&tmp);
        let path = tmp.join("geocode_cache.json");

        let mut cache = AddressCache::load(&path);
        assert!(cache.is_empty());
        cache.put("Euclid High School", EUCLID);
        cache.save().unwrap();
        assert!(!cache.is_dirty());

        let reloaded = AddressCache::load(&path);
        assert_eq!(reloaded.get("Euclid High School"), Some(EUCLID));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn legacy_lat_lng_files_load() {
        let tmp = std::env::temp_dir().join("org_map_cache_legacy");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("geocode_cache.json");
        fs::write(&path, r#"{"Dayton, Ohio, school": {"lat": 39.76, "lng": -84.19}}"#).unwrap();

        let cache = AddressCache::load(&path);
        let entry = cache.get_entry("Dayton, Ohio, school").unwrap();
        assert!(entry.display_name.is_none());
        assert!(entry.address.is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn corrupt_file_starts_empty_and_is_replaced() {
        let tmp = std::env::temp_dir().join("org_map_cache_corrupt");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("geocode_cache.json");
        fs::write(&path, "{\"truncated\": {\"lat\": 4").unwrap();

        let mut cache = AddressCache::load(&path);
        assert!(cache.is_empty());
        cache.put("Euclid High School", EUCLID);
        cache.save().unwrap();

        let reloaded = AddressCache::load(&path);
        assert_eq!(reloaded.len(), 1);

        let _ = fs::remove_dir_all(&tmp);
    }
}
