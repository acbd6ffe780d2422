//! Request DTOs for the cache API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

/// Request body for the SET operation (PUT /set)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds (uses the default if not specified)
    #[serde(default)]
    pub ttl: Option<i64>,
    /// Tags the entry depends on
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.tags.iter().any(|tag| tag.is_empty()) {
            return Some("Tags cannot be empty".to_string());
        }
        None
    }
}

/// Request body for tag invalidation (POST /invalidate)
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub tags: Vec<String>,
}

impl InvalidateRequest {
    pub fn validate(&self) -> Option<String> {
        if self.tags.is_empty() {
            return Some("At least one tag is required".to_string());
        }
        None
    }
}
