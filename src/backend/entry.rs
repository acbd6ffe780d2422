//! Stored Entry Module
//!
//! Raw value plus its backend-level expiry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{current_timestamp_ms, Ttl};

// == Stored Entry ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    #[serde(default)]
    pub expires_at: Option<u64>,
}

impl StoredEntry {
    pub fn new(value: Value, ttl: Ttl) -> Self {
        Self {
            value,
            expires_at: ttl.expiry_from(current_timestamp_ms()),
        }
    }

    /// Expired once `now_ms` reaches the expiry.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        matches!(self.expires_at, Some(expires) if now_ms >= expires)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Remaining lifetime in milliseconds, None if it never expires.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_forever_entry() {
        let entry = StoredEntry::new(json!("v"), Ttl::forever());
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired_at(u64::MAX));
        assert!(entry.ttl_remaining_ms().is_none());
    }

    #[test]
    fn test_expiry_boundary() {
        let entry = StoredEntry {
            value: json!(1),
            expires_at: Some(100),
        };
        assert!(!entry.is_expired_at(99));
        assert!(entry.is_expired_at(100));
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = StoredEntry::new(json!(1), Ttl::seconds(10));
        let remaining = entry.ttl_remaining_ms().unwrap();
        assert!(remaining <= 10_000 && remaining >= 9_000);
    }

    #[test]
    fn test_serde_shape() {
        let entry: StoredEntry = serde_json::from_str(r#"{"value":{"a":1}}"#).unwrap();
        assert_eq!(entry.value, json!({"a": 1}));
        assert!(entry.expires_at.is_none());
    }
}
