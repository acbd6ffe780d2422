//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::cache::CacheItemMetadata;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
///
/// Every variant raised at the backend boundary carries the offending key(s).
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key cannot be serialized deterministically
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Caller supplied an argument outside its domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Backend rejected a single-key write. The index still holds the
    /// pre-write record for `key`.
    #[error("Failed to store cache entry '{key}'")]
    SetCacheFailure {
        key: String,
        value: Value,
        metadata: Box<CacheItemMetadata>,
    },

    /// Backend rejected a batched write
    #[error("Failed to store cache entries: {}", .keys.join(", "))]
    SetMultipleCacheFailure { keys: Vec<String> },

    /// Backend rejected a delete; metadata left untouched
    #[error("Failed to remove cache entries: {}", .keys.join(", "))]
    RemoveCacheFailure { keys: Vec<String> },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns the canonical keys involved in a backend failure, if any.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            CacheError::SetCacheFailure { key, .. } => vec![key.as_str()],
            CacheError::SetMultipleCacheFailure { keys }
            | CacheError::RemoveCacheFailure { keys } => keys.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey(_) | CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::SetCacheFailure { .. }
            | CacheError::SetMultipleCacheFailure { .. }
            | CacheError::RemoveCacheFailure { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
