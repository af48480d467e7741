//! Local JSON persistence for usage counters and roast history.

pub mod history;
pub mod usage;

use std::error::Error;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::config::data::path_display;

pub use history::{FileSessionStore, RoastSession, SessionStore};
pub use usage::{UsageStatus, UsageTracker};

#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { path, source } => {
                write!(f, "Failed to access {}: {}", path_display(path), source)
            }
            StoreError::Corrupt { path, source } => {
                write!(f, "Unreadable data in {}: {}", path_display(path), source)
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Corrupt { source, .. } => Some(source),
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a JSON document, or its default when the file does not exist yet.
pub(crate) fn read_json<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path_display(path), "No data file yet");
            return Ok(T::default());
        }
        Err(err) => return Err(io_error(path)(err)),
    };
    if contents.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace `path` with the JSON form of `value` in one rename.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(io_error(dir))?;

    let contents = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    let mut temp_file = NamedTempFile::new_in(dir).map_err(io_error(dir))?;
    temp_file.write_all(&contents).map_err(io_error(path))?;
    temp_file.as_file_mut().sync_all().map_err(io_error(path))?;
    temp_file
        .persist(path)
        .map_err(|err| io_error(path)(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn missing_and_empty_files_read_as_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");
        let value: BTreeMap<String, u32> = read_json(&path).unwrap();
        assert!(value.is_empty());

        fs::write(&path, "  \n").unwrap();
        let value: BTreeMap<String, u32> = read_json(&path).unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn write_then_read_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data.json");
        let mut value = BTreeMap::new();
        value.insert("a".to_string(), 1_u32);

        write_json(&path, &value).unwrap();
        let loaded: BTreeMap<String, u32> = read_json(&path).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "{not json").unwrap();

        let err = read_json::<BTreeMap<String, u32>>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert!(err.to_string().starts_with("Unreadable data in"));
    }
}
