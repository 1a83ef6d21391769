//! CSV extract reader.
//!
//! Reads a headered CSV export into column → value rows and maps them to
//! [`InputRecord`]s through a [`FieldMapping`].

use std::path::{Path, PathBuf};

use org_map_records_models::InputRecord;
use org_map_records_models::fields::{FieldMapping, RawRow};
use thiserror::Error;

/// Errors from reading a CSV extract.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file could not be opened or a row could not be parsed.
    #[error("Failed to read CSV {path}: {source}")]
    Csv {
        /// Extract path.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },
}

/// Reads every row of `path` as a header → value map.
///
/// Short rows are allowed; missing trailing cells are simply absent.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] if the file cannot be opened or parsed.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>, SourceError> {
    let wrap = |source| SourceError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(wrap)?;
    let headers = reader.headers().map_err(wrap)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(wrap)?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Reads `path` and resolves every row through `mapping`.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] if the file cannot be opened or parsed.
pub fn load_records(path: &Path, mapping: &FieldMapping) -> Result<Vec<InputRecord>, SourceError> {
    let rows = read_rows(path)?;
    log::info!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows.iter().map(|row| mapping.resolve(row)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn maps_export_columns_to_records() {
        let tmp = std::env::temp_dir().join("org_map_csv_source");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("apptegy.csv");
        fs::write(
            &path,
            "Record ID,Company name,Company Domain Name,City,Website\n\
             100,Lincoln HS,lincoln.k12.oh.us,Euclid,lincoln.org\n\
             200,\"Jefferson MS, Austin\",,nan\n",
        )
        .unwrap();

        let records = load_records(&path, &FieldMapping::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_id, "100");
        assert_eq!(records[0].website.as_deref(), Some("https://lincoln.org"));
        assert_eq!(records[1].name, "Jefferson MS, Austin");
        assert_eq!(records[1].domain, None);
        assert_eq!(records[1].city, None);
        assert_eq!(records[1].website, None);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("org_map_csv_source_missing.csv");
        let _ = fs::remove_file(&path);
        assert!(matches!(read_rows(&path), Err(SourceError::Csv { .. })));
    }
}
