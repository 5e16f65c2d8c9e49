//! Durable credential storage.
//!
//! A small string key/value surface, like browser local storage. The file
//! backend keeps one JSON object on disk and rewrites it atomically.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// Storage key holding the raw API-key credential.
pub const STORAGE_KEY_API_KEY: &str = "api_key";
/// Storage key holding the exported session cookie header.
pub const STORAGE_KEY_SESSION: &str = "session_cookie";

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("credential storage {operation} failed for {}", path.display())]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// File involved.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The storage file exists but is not a JSON object of strings.
    #[error("credential storage at {} is corrupt", path.display())]
    Corrupt {
        /// File involved.
        path: PathBuf,
        /// Parse failure.
        source: serde_json::Error,
    },
}

/// Convenience alias for storage results.
pub type StorageResult<T> = Result<T, StorageError>;

/// Key/value storage that survives process restarts.
pub trait CredentialStorage: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`; removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be written.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// In-process storage, used by tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStorage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// JSON-file storage. A missing file reads as empty.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStorage {
    /// Storage backed by the file at `path`; nothing is touched until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    operation: "read",
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&raw).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let io_err = |operation: &'static str, path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| StorageError::Io {
                operation,
                path,
                source,
            }
        };

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err("create directory", parent))?;
        }

        let body = serde_json::to_vec_pretty(entries).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        write_private(&staging, &body).map_err(io_err("write", &staging))?;
        fs::rename(&staging, &self.path).map_err(io_err("replace", &self.path))
    }

    fn modify<F>(&self, change: F) -> StorageResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _lock = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        if change(&mut entries) {
            self.store(&entries)?;
        }
        Ok(())
    }
}

impl CredentialStorage for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _lock = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.modify(|entries| entries.remove(key).is_some())
    }
}

/// Write `body` to a freshly created file readable by the owner only.
///
/// A leftover file at `path` is removed first so the mode is applied at
/// creation; the credential never sits in a file with wider permissions.
#[cfg(unix)]
fn write_private(path: &Path, body: &[u8]) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err),
        _ => {}
    }
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(body)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, body: &[u8]) -> io::Result<()> {
    fs::write(path, body)
}
