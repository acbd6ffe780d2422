//! Reusable Dependency Data
//!
//! Fingerprints memoized for one unit of work (one request, one job).

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;

// == Reusable Data ==
/// Memo of fingerprints keyed by dependency identity hash.
///
/// Owners must call [`ReusableData::reset`] at each unit-of-work boundary.
/// Concurrent writers for one hash are last-writer-wins.
#[derive(Debug, Default)]
pub struct ReusableData {
    entries: Mutex<HashMap<String, Value>>,
}

impl ReusableData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, hash: &str) -> Option<Value> {
        self.entries.lock().get(hash).cloned()
    }

    pub fn store(&self, hash: String, data: Value) {
        self.entries.lock().insert(hash, data);
    }

    /// Forgets every memoized fingerprint.
    pub fn reset(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
