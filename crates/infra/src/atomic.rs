//! Whole-document JSON files replaced atomically.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::store::StoreError;

/// Read and parse a document. A missing or empty file yields `None`.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| StoreError::Corrupt(format!("{}: {err}", path.display())))
}

/// Serialize into a temp file next to `path`, fsync it, then rename it over
/// `path`. On any error the temp file is removed and `path` is untouched.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| StoreError::Io(err.error))?;
    Ok(())
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn claim_path(path: &Path, revision: u64) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    parent_dir(path).join(format!(".{name}.rev-{revision}"))
}

/// Reserve `revision` of the document at `path` with a marker file created
/// without clobbering. Returns `false` when another writer already holds it.
pub(crate) fn claim(path: &Path, revision: u64) -> Result<bool, StoreError> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;

    let mut marker = NamedTempFile::new_in(dir)?;
    writeln!(marker, "{}", std::process::id())?;
    match marker.persist_noclobber(claim_path(path, revision)) {
        Ok(_) => Ok(true),
        Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(StoreError::Io(err.error)),
    }
}

/// Age of the marker for `revision`, if there is one.
pub(crate) fn claim_age(path: &Path, revision: u64) -> Result<Option<Duration>, StoreError> {
    match fs::metadata(claim_path(path, revision)) {
        Ok(meta) => Ok(Some(meta.modified()?.elapsed().unwrap_or_default())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn release(path: &Path, revision: u64) -> Result<(), StoreError> {
    match fs::remove_file(claim_path(path, revision)) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}
