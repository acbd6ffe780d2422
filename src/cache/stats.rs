//! Cache Statistics Module
//!
//! Tracks facade-level hits, misses, stale reads and writes.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads answered from the backend
    pub hits: u64,
    /// Reads that found nothing usable, stale reads included
    pub misses: u64,
    /// Reads rejected by metadata (expiry, early expiry or dependency)
    pub stale: u64,
    /// Successful writes
    pub writes: u64,
    /// Records currently held by the metadata index
    pub tracked_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// A stale read also counts as a miss.
    pub fn record_stale(&mut self) {
        self.stale += 1;
        self.misses += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn set_tracked_entries(&mut self, count: usize) {
        self.tracked_entries = count;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_stale_counts_as_miss() {
        let mut stats = CacheStats::new();
        stats.record_stale();
        assert_eq!(stats.stale, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_writes_and_entries() {
        let mut stats = CacheStats::new();
        stats.record_write();
        stats.record_write();
        stats.set_tracked_entries(4);
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.tracked_entries, 4);
    }
}
