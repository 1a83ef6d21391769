//! JSON file persistence with write-then-rename.
//!
//! Every artifact the pipeline rewrites (address cache, checkpoint, batch
//! summary, canonical dataset) goes through [`write_json_atomic`], so a
//! crash mid-write leaves either the previous file or the new one, never a
//! truncated mix.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Returns the sibling temp path used while `path` is being rewritten.
#[must_use]
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Reads and deserializes a JSON file.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be opened, or an
/// [`io::ErrorKind::InvalidData`] error if it is not valid JSON for `T`,
/// including a file truncated mid-document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> io::Result<T> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| {
            if e.is_io() {
                io::Error::from(e)
            } else {
                io::Error::new(io::ErrorKind::InvalidData, e)
            }
        })
}

/// Serializes `value` as pretty JSON into `path` via a temp file and rename.
///
/// Parent directories are created if needed. On failure the temp file is
/// removed (best effort) and `path` is left untouched.
///
/// # Errors
///
/// Returns any I/O or serialization error encountered.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let result = write_file(&tmp, value).and_then(|()| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_file<T: Serialize + ?Sized>(tmp: &Path, value: &T) -> io::Result<()> {
    let file = File::create(tmp)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
    file.sync_all()
}
