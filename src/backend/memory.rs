//! Memory Backend Module
//!
//! In-process store with per-entry expiry and least-recently-used eviction.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::backend::{LruTracker, StorageBackend, StoredEntry};
use crate::cache::{current_timestamp_ms, Ttl};

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, StoredEntry>,
    lru: LruTracker,
    evictions: u64,
}

impl MemoryState {
    fn remove(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.entries.remove(key).is_some()
    }
}

// == Memory Backend ==
/// Bounded in-memory backend.
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    /// Maximum number of entries held at once
    max_entries: usize,
}

impl MemoryBackend {
    // == Constructor ==
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            max_entries,
        }
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Entries dropped to make room since creation.
    pub fn evictions(&self) -> u64 {
        self.state.lock().evictions
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl StorageBackend for MemoryBackend {
    // == Get ==
    fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.state.lock();
        let expired = state.entries.get(key)?.is_expired();
        if expired {
            state.remove(key);
            return None;
        }

        state.lru.touch(key);
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Set ==
    fn set(&self, key: &str, value: &Value, ttl: Ttl) -> bool {
        let mut state = self.state.lock();

        if ttl.is_expired() {
            state.remove(key);
            return true;
        }

        let is_overwrite = state.entries.contains_key(key);
        if !is_overwrite && state.entries.len() >= self.max_entries {
            match state.lru.evict_oldest() {
                Some(evicted) => {
                    state.entries.remove(&evicted);
                    state.evictions += 1;
                    debug!(key = %evicted, "Evicted least recently used entry");
                }
                None => return false,
            }
        }

        state
            .entries
            .insert(key.to_string(), StoredEntry::new(value.clone(), ttl));
        state.lru.touch(key);
        true
    }

    // == Delete ==
    fn delete(&self, key: &str) -> bool {
        self.state.lock().remove(key);
        true
    }

    fn clear(&self) -> bool {
        let mut state = self.state.lock();
        state.entries.clear();
        state.lru.clear();
        true
    }

    fn has(&self, key: &str) -> bool {
        self.state
            .lock()
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    // == Purge Expired ==
    fn purge_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let mut state = self.state.lock();
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
        }
        expired.len()
    }
}
