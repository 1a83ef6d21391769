#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reconciliation of geocoded batches with the canonical dataset.
//!
//! [`merge::merge`] is a pure function over in-memory records; [`dataset`]
//! wraps it with the file handling: timestamped backup, atomic rewrite,
//! restore on failure, and a count check after writing.

pub mod convert;
pub mod dataset;
pub mod merge;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a merge.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The canonical dataset exists but could not be read.
    #[error("Failed to read dataset {path}: {source}")]
    DatasetRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The batch summary could not be read.
    #[error("Failed to read batch summary {path}: {source}")]
    BatchRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The dataset could not be moved to its backup path. Nothing changed.
    #[error("Failed to back up dataset to {path}: {source}")]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The merged dataset could not be written. The backup was restored.
    #[error("Failed to write merged dataset {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The write failed and the backup could not be moved back.
    #[error("Failed to restore {path} from backup {backup}: {source}")]
    Restore {
        path: PathBuf,
        backup: PathBuf,
        source: std::io::Error,
    },
}
