//! Metadata Index Module
//!
//! In-process table of freshness records keyed by canonical key.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cache::{CacheItemMetadata, Dependency};

// == Cache Metadata Index ==
/// Maps canonical keys to their freshness records.
///
/// This is advisory state. A key with no record is not an error: it was
/// written before this process started or through another cache instance,
/// and the backend's own TTL decides.
#[derive(Debug, Default)]
pub struct CacheMetadataIndex {
    items: RwLock<HashMap<String, CacheItemMetadata>>,
}

impl CacheMetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // == Lookup ==
    /// Returns a snapshot of the record for `key`.
    pub fn get(&self, key: &str) -> Option<CacheItemMetadata> {
        self.items.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.read().contains_key(key)
    }

    // == Write ==
    /// Records a successful write, updating an existing record in place.
    pub fn record(&self, key: &str, expiry: Option<u64>, dependency: Option<Arc<Dependency>>) {
        let mut items = self.items.write();
        match items.get_mut(key) {
            Some(item) => item.update(expiry, dependency),
            None => {
                items.insert(
                    key.to_string(),
                    CacheItemMetadata::new(key, expiry, dependency),
                );
            }
        }
    }

    /// Inserts a prepared record, replacing any previous one.
    pub fn insert(&self, item: CacheItemMetadata) {
        self.items.write().insert(item.key().to_string(), item);
    }

    // == Remove ==
    pub fn remove(&self, key: &str) -> bool {
        self.items.write().remove(key).is_some()
    }

    pub fn remove_many<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut items = self.items.write();
        for key in keys {
            items.remove(key);
        }
    }

    /// Removes the record for `key` when `gone` confirms the backend lost it.
    ///
    /// `gone` runs under the write lock.
    pub fn remove_if_gone<F>(&self, key: &str, gone: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let mut items = self.items.write();
        if items.contains_key(key) && gone() {
            items.remove(key);
            return true;
        }
        false
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }

    // == Prune ==
    /// Drops records whose absolute expiry has passed. Returns how many.
    pub fn prune_expired(&self, now_ms: u64) -> usize {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|_, item| !item.is_hard_expired(now_ms));
        before - items.len()
    }

    /// Keeps only records whose key satisfies `keep`. Returns how many were dropped.
    pub fn retain_keys<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|key, _| keep(key));
        before - items.len()
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}
