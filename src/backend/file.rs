//! File Backend Module
//!
//! One JSON document per key inside a cache directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::warn;

use crate::backend::{StorageBackend, StoredEntry};
use crate::cache::{current_timestamp_ms, Ttl};

const EXTENSION: &str = "json";

// == File Backend ==
#[derive(Debug, Clone)]
pub struct FileBackend {
    base_path: PathBuf,
}

impl FileBackend {
    /// Opens (and creates if needed) the cache directory.
    pub fn new(base_path: impl AsRef<Path>) -> io::Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// File path for a key; path separators and reserved characters are replaced.
    fn key_path(&self, key: &str) -> PathBuf {
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|', '.'], "_");
        self.base_path.join(format!("{}.{}", safe_key, EXTENSION))
    }

    fn read_entry(&self, path: &Path) -> Option<StoredEntry> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache file");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt cache file, removing");
                let _ = fs::remove_file(path);
                None
            }
        }
    }

    /// Writes through a temporary file renamed into place.
    fn write_entry(&self, path: &Path, entry: &StoredEntry) -> io::Result<()> {
        let bytes = serde_json::to_vec(entry)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)
    }

    fn remove_path(path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn entry_paths(&self) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for dir_entry in fs::read_dir(&self.base_path)? {
            let path = dir_entry?.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Option<Value> {
        let path = self.key_path(key);
        let entry = self.read_entry(&path)?;
        if entry.is_expired() {
            let _ = Self::remove_path(&path);
            return None;
        }
        Some(entry.value)
    }

    fn set(&self, key: &str, value: &Value, ttl: Ttl) -> bool {
        if ttl.is_expired() {
            return self.delete(key);
        }

        let entry = StoredEntry::new(value.clone(), ttl);
        match self.write_entry(&self.key_path(key), &entry) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "Failed to write cache file");
                false
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        match Self::remove_path(&self.key_path(key)) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "Failed to delete cache file");
                false
            }
        }
    }

    fn clear(&self) -> bool {
        let paths = match self.entry_paths() {
            Ok(paths) => paths,
            Err(e) => {
                warn!(error = %e, "Failed to list cache directory");
                return false;
            }
        };

        paths.iter().fold(true, |ok, path| match Self::remove_path(path) {
            Ok(()) => ok,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to delete cache file");
                false
            }
        })
    }

    fn purge_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let Ok(paths) = self.entry_paths() else {
            return 0;
        };

        paths
            .iter()
            .filter(|path| {
                self.read_entry(path)
                    .is_some_and(|entry| entry.is_expired_at(now))
            })
            .filter(|path| Self::remove_path(path).is_ok())
            .count()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    fn backend() -> (tempfile::TempDir, FileBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("cache")).unwrap();
        (dir, backend)
    }

    #[test]
    fn test_set_and_get() {
        let (_dir, backend) = backend();
        assert!(backend.set("k", &json!({"name": "Ann"}), Ttl::forever()));
        assert_eq!(backend.get("k"), Some(json!({"name": "Ann"})));
        assert!(backend.has("k"));
    }

    #[test]
    fn test_key_is_sanitized() {
        let (_dir, backend) = backend();
        assert!(backend.set("../escape", &json!(1), Ttl::forever()));
        assert_eq!(backend.get("../escape"), Some(json!(1)));
        assert!(backend.base_path().join("___escape.json").exists());
    }

    #[test]
    fn test_delete_and_missing() {
        let (_dir, backend) = backend();
        backend.set("k", &json!(1), Ttl::forever());
        assert!(backend.delete("k"));
        assert!(backend.delete("k"));
        assert_eq!(backend.get("k"), None);
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let (_dir, backend) = backend();
        backend.set("k", &json!(1), Ttl::seconds(1));
        sleep(Duration::from_millis(1100));
        assert_eq!(backend.get("k"), None);
    }

    #[test]
    fn test_corrupt_file_is_absent() {
        let (_dir, backend) = backend();
        fs::write(backend.base_path().join("bad.json"), "not json").unwrap();
        assert_eq!(backend.get("bad"), None);
        assert!(!backend.base_path().join("bad.json").exists());
    }

    #[test]
    fn test_clear_and_purge() {
        let (_dir, backend) = backend();
        backend.set("short", &json!(1), Ttl::seconds(1));
        backend.set("long", &json!(2), Ttl::forever());

        sleep(Duration::from_millis(1100));
        assert_eq!(backend.purge_expired(), 1);
        assert!(backend.has("long"));

        assert!(backend.clear());
        assert!(!backend.has("long"));
    }
}
