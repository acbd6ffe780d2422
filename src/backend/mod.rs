//! Storage Backend Module
//!
//! Raw key/value stores the cache facade writes through. Keys reaching a
//! backend are already canonical.

mod entry;
mod file;
mod lru;
mod memory;

pub use entry::StoredEntry;
pub use file::FileBackend;
pub use lru::LruTracker;
pub use memory::MemoryBackend;

use std::collections::HashMap;

use serde_json::Value;

use crate::cache::Ttl;

// == Storage Backend ==
/// Primitive store contract.
///
/// Mutations report success as `bool`; adapters log their own I/O failures.
/// A value written with [`Ttl::forever`] must survive until deleted or
/// cleared. Writing with a non-positive TTL removes the key.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn get_multiple(&self, keys: &[String]) -> HashMap<String, Option<Value>> {
        keys.iter().map(|key| (key.clone(), self.get(key))).collect()
    }

    fn set(&self, key: &str, value: &Value, ttl: Ttl) -> bool;

    /// Attempts every write, even after a failure.
    fn set_multiple(&self, values: &HashMap<String, Value>, ttl: Ttl) -> bool {
        values
            .iter()
            .fold(true, |ok, (key, value)| self.set(key, value, ttl) && ok)
    }

    /// True when the key is gone afterwards, whether or not it existed.
    fn delete(&self, key: &str) -> bool;

    fn delete_multiple(&self, keys: &[String]) -> bool {
        keys.iter().fold(true, |ok, key| self.delete(key) && ok)
    }

    fn clear(&self) -> bool;

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Drops expired data the adapter still holds. Returns how many entries.
    fn purge_expired(&self) -> usize {
        0
    }
}
