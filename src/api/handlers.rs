//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::backend::{FileBackend, MemoryBackend, StorageBackend};
use crate::cache::{Cache, Dependency, Ttl};
use crate::config::{BackendKind, Config};
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, InvalidateRequest,
    InvalidateResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The cache synchronizes internally, so handlers share it through a plain `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<Cache>,
}

impl AppState {
    pub fn new(cache: Cache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the configured backend and applies the default TTL and beta.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend: Arc<dyn StorageBackend> = match config.backend {
            BackendKind::Memory => Arc::new(MemoryBackend::new(config.max_entries)),
            BackendKind::File => {
                let backend = FileBackend::new(&config.cache_dir).map_err(|e| {
                    CacheError::Internal(format!(
                        "cannot open cache directory {}: {}",
                        config.cache_dir.display(),
                        e
                    ))
                })?;
                Arc::new(backend)
            }
        };
        info!(backend = ?config.backend, "Storage backend ready");
        Ok(Self::new(Cache::from_config(config, backend)?))
    }
}

/// Runs a cache call on the blocking pool.
///
/// Every call that reaches the backend goes through here; backends are
/// synchronous and the file backend does disk I/O.
async fn run_blocking<F, T>(cache: &Arc<Cache>, f: F) -> Result<T>
where
    F: FnOnce(&Cache) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let cache = Arc::clone(cache);
    tokio::task::spawn_blocking(move || f(&cache))
        .await
        .map_err(|e| CacheError::Internal(format!("cache task failed: {}", e)))?
}

/// Handler for PUT /set
///
/// Stores a value with optional TTL and tag dependency.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidArgument(error_msg));
    }

    let SetRequest {
        key,
        value,
        ttl,
        tags,
    } = req;
    let dependency = if tags.is_empty() {
        None
    } else {
        Some(Arc::new(Dependency::tags(tags)))
    };
    let cache_key = key.clone();
    run_blocking(&state.cache, move |cache| {
        cache.set(cache_key, value, ttl.map(Ttl::seconds), dependency)
    })
    .await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /get/:key
///
/// A miss, an expired entry and an invalidated entry all answer 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let cache_key = key.clone();
    match run_blocking(&state.cache, move |cache| cache.get(cache_key)).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let cache_key = key.clone();
    if !run_blocking(&state.cache, move |cache| cache.remove(cache_key)).await? {
        return Err(CacheError::RemoveCacheFailure { keys: vec![key] });
    }
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /invalidate
///
/// Bumps every listed tag so dependent entries miss on their next read.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidArgument(error_msg));
    }
    let tags = req.tags.clone();
    run_blocking(&state.cache, move |cache| cache.invalidate_tags(&tags)).await?;
    Ok(Json(InvalidateResponse::new(req.tags)))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    if !run_blocking(&state.cache, |cache| Ok(cache.clear())).await? {
        return Err(CacheError::Internal("backend refused to clear".to_string()));
    }
    Ok(Json(ClearResponse::cleared()))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
