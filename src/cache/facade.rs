//! Cache Facade Module
//!
//! Public entry point combining key normalization, the metadata index,
//! dependencies and a storage backend.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::StorageBackend;
use crate::cache::{
    current_timestamp_ms, normalize, CacheItemMetadata, CacheKey, CacheMetadataIndex, CacheStats,
    Dependency, RandomSource, ReusableData, TagDependency, ThreadRandom, Ttl,
};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Default early-expiration factor
pub const DEFAULT_BETA: f64 = 1.0;

/// Outcome of one garbage collection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Expired entries dropped by the backend
    pub purged: usize,
    /// Expired records dropped from the metadata index
    pub pruned: usize,
    /// Records dropped because the backend no longer holds their key
    pub orphaned: usize,
}

// == Cache ==
/// Dependency-aware cache over a storage backend.
///
/// Concurrent `get_or_set` calls for one key may both produce; there is no
/// single-flight guard. Early expiration spreads regeneration of hot keys.
pub struct Cache {
    backend: Arc<dyn StorageBackend>,
    index: CacheMetadataIndex,
    reusable: ReusableData,
    random: Box<dyn RandomSource>,
    default_ttl: Ttl,
    default_beta: f64,
    stats: Mutex<CacheStats>,
}

impl Cache {
    // == Constructor ==
    /// Creates a cache with no default expiry and `beta` of 1.0.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            index: CacheMetadataIndex::new(),
            reusable: ReusableData::new(),
            random: Box::new(ThreadRandom),
            default_ttl: Ttl::forever(),
            default_beta: DEFAULT_BETA,
            stats: Mutex::new(CacheStats::new()),
        }
    }

    /// Creates a cache using the configured defaults.
    pub fn from_config(config: &Config, backend: Arc<dyn StorageBackend>) -> Result<Self> {
        Self::new(backend)
            .with_default_ttl(config.default_ttl())
            .with_default_beta(config.beta)
    }

    /// TTL used when a write passes `None`.
    pub fn with_default_ttl(mut self, ttl: Ttl) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Beta used when `get_or_set` passes `None`.
    pub fn with_default_beta(mut self, beta: f64) -> Result<Self> {
        self.default_beta = validate_beta(beta)?;
        Ok(self)
    }

    pub fn with_random_source(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Box::new(random);
        self
    }

    // == Accessors ==
    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    pub fn metadata(&self) -> &CacheMetadataIndex {
        &self.index
    }

    pub fn reusable_data(&self) -> &ReusableData {
        &self.reusable
    }

    pub fn random_source(&self) -> &dyn RandomSource {
        self.random.as_ref()
    }

    pub fn default_ttl(&self) -> Ttl {
        self.default_ttl
    }

    pub fn default_beta(&self) -> f64 {
        self.default_beta
    }

    // == Get ==
    /// Returns the value for `key`, or `None` when absent, expired or
    /// invalidated by its dependency.
    pub fn get(&self, key: impl Into<CacheKey>) -> Result<Option<Value>> {
        let key = normalize(&key.into())?;
        self.lookup(&key, None)
    }

    /// Like [`Cache::get`], falling back to `default` on a miss.
    pub fn get_or(&self, key: impl Into<CacheKey>, default: Value) -> Result<Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Reads several keys; results follow input order.
    pub fn get_multiple<I, K>(&self, keys: I) -> Result<Vec<Option<Value>>>
    where
        I: IntoIterator<Item = K>,
        K: Into<CacheKey>,
    {
        let keys = normalize_all(keys)?;
        let mut fresh = Vec::with_capacity(keys.len());
        let mut rejected = HashSet::new();
        for key in &keys {
            if self.rejected_by_metadata(key, None)? {
                debug!(key = %key, "Stale entry");
                rejected.insert(key.as_str());
            } else {
                fresh.push(key.clone());
            }
        }

        let found = self.backend.get_multiple(&fresh);
        for key in &fresh {
            if found.get(key).map_or(true, Option::is_none) {
                self.forget_if_evicted(key);
            }
        }

        let mut stats = self.stats.lock();
        Ok(keys
            .iter()
            .map(|key| {
                if rejected.contains(key.as_str()) {
                    stats.record_stale();
                    return None;
                }
                let value = found.get(key).cloned().flatten();
                if value.is_some() {
                    stats.record_hit();
                } else {
                    stats.record_miss();
                }
                value
            })
            .collect())
    }

    /// True when a fresh value exists for `key`.
    pub fn has(&self, key: impl Into<CacheKey>) -> Result<bool> {
        let key = normalize(&key.into())?;
        if self.rejected_by_metadata(&key, None)? {
            return Ok(false);
        }
        Ok(self.backend.has(&key))
    }

    // == Set ==
    /// Stores `value` under `key`.
    ///
    /// `ttl = None` uses the default TTL; a non-positive TTL removes the key.
    /// On backend failure the index keeps its previous record.
    pub fn set(
        &self,
        key: impl Into<CacheKey>,
        value: Value,
        ttl: Option<Ttl>,
        dependency: Option<Arc<Dependency>>,
    ) -> Result<()> {
        let key = normalize(&key.into())?;
        if let Some(dependency) = &dependency {
            dependency.evaluate(self);
        }
        self.store(&key, value, ttl.unwrap_or(self.default_ttl), dependency)?;
        Ok(())
    }

    /// Stores several values sharing one TTL and dependency.
    ///
    /// Each key the backend accepts gets its new record even when others are
    /// refused; the error lists only the refused keys.
    pub fn set_multiple<I, K>(
        &self,
        values: I,
        ttl: Option<Ttl>,
        dependency: Option<Arc<Dependency>>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<CacheKey>,
    {
        let mut batch = HashMap::new();
        for (key, value) in values {
            batch.insert(normalize(&key.into())?, value);
        }
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl.is_expired() {
            let keys: Vec<String> = batch.into_keys().collect();
            return self.delete_canonical(&keys);
        }

        if let Some(dependency) = &dependency {
            dependency.evaluate(self);
        }

        let expiry = ttl.expiry_from(current_timestamp_ms());
        let mut failed = Vec::new();
        for (key, value) in &batch {
            if self.backend.set(key, value, ttl) {
                self.index.record(key, expiry, dependency.clone());
                self.stats.lock().record_write();
            } else {
                failed.push(key.clone());
            }
        }

        if !failed.is_empty() {
            failed.sort();
            warn!(keys = ?failed, "Backend rejected part of a batched write");
            return Err(CacheError::SetMultipleCacheFailure { keys: failed });
        }
        Ok(())
    }

    // == Get Or Set ==
    /// Returns the cached value for `key`, producing and storing it on a miss.
    ///
    /// The entry counts as a miss when the backend has nothing, the record
    /// expired (early expiration included, scaled by `beta`) or the attached
    /// dependency changed. `producer` receives this cache so it can make
    /// nested calls. The dependency is evaluated after production.
    pub fn get_or_set<F>(
        &self,
        key: impl Into<CacheKey>,
        producer: F,
        ttl: Option<Ttl>,
        dependency: Option<Arc<Dependency>>,
        beta: Option<f64>,
    ) -> Result<Value>
    where
        F: FnOnce(&Cache) -> Result<Value>,
    {
        let beta = validate_beta(beta.unwrap_or(self.default_beta))?;
        let key = normalize(&key.into())?;

        if let Some(value) = self.lookup(&key, Some(beta))? {
            return Ok(value);
        }

        debug!(key = %key, "Producing value");
        let value = producer(self)?;

        if let Some(dependency) = &dependency {
            dependency.evaluate(self);
        }
        self.store(&key, value, ttl.unwrap_or(self.default_ttl), dependency)
    }

    // == Remove ==
    /// Deletes `key`. Returns `false` when the backend refused, in which
    /// case the metadata record is left untouched.
    pub fn remove(&self, key: impl Into<CacheKey>) -> Result<bool> {
        let key = normalize(&key.into())?;
        if !self.backend.delete(&key) {
            warn!(key = %key, "Backend refused delete");
            return Ok(false);
        }
        self.index.remove(&key);
        Ok(true)
    }

    /// Deletes several keys, failing with the keys when the backend refused.
    pub fn remove_multiple<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<CacheKey>,
    {
        let keys = normalize_all(keys)?;
        self.delete_canonical(&keys)
    }

    // == Clear ==
    /// Empties the backend, then the index. Returns `false` when the
    /// backend refused, leaving the index as it was.
    pub fn clear(&self) -> bool {
        if !self.backend.clear() {
            warn!("Backend refused clear");
            return false;
        }
        self.index.clear();
        true
    }

    // == Invalidation ==
    /// Bumps the version of every tag in `tags`.
    pub fn invalidate_tags<S: AsRef<str>>(&self, tags: &[S]) -> Result<()> {
        TagDependency::invalidate(self, tags)
    }

    /// Ends the current unit of work for reusable dependencies.
    pub fn reset_reusable_data(&self) {
        self.reusable.reset();
    }

    // == Maintenance ==
    /// Drops expired backend data, expired index records and records whose
    /// key the backend evicted.
    pub fn collect_garbage(&self) -> GcReport {
        let purged = self.backend.purge_expired();
        let pruned = self.index.prune_expired(current_timestamp_ms());
        let orphaned = self.index.retain_keys(|key| self.backend.has(key));
        GcReport {
            purged,
            pruned,
            orphaned,
        }
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.lock().clone();
        stats.set_tracked_entries(self.index.len());
        stats
    }

    // == Internals ==
    /// True when the index has a record for `key` that is no longer valid.
    /// `beta = None` checks only the hard expiry and the dependency.
    fn rejected_by_metadata(&self, key: &str, beta: Option<f64>) -> Result<bool> {
        let Some(item) = self.index.get(key) else {
            return Ok(false);
        };
        match beta {
            Some(beta) => item.is_stale(beta, self),
            None => Ok(item.is_hard_expired(current_timestamp_ms()) || item.dependency_changed(self)),
        }
    }

    fn lookup(&self, key: &str, beta: Option<f64>) -> Result<Option<Value>> {
        if self.rejected_by_metadata(key, beta)? {
            debug!(key = %key, "Stale entry");
            self.stats.lock().record_stale();
            return Ok(None);
        }

        let value = self.backend.get(key);
        if value.is_none() {
            self.forget_if_evicted(key);
        }

        let mut stats = self.stats.lock();
        if value.is_some() {
            debug!(key = %key, "Cache hit");
            stats.record_hit();
        } else {
            debug!(key = %key, "Cache miss");
            stats.record_miss();
        }
        Ok(value)
    }

    /// Writes through to the backend, then records metadata. The index is
    /// only touched once the backend accepted the write.
    fn store(
        &self,
        key: &str,
        value: Value,
        ttl: Ttl,
        dependency: Option<Arc<Dependency>>,
    ) -> Result<Value> {
        if ttl.is_expired() {
            self.delete_canonical(&[key.to_string()])?;
            return Ok(value);
        }

        let expiry = ttl.expiry_from(current_timestamp_ms());
        if !self.backend.set(key, &value, ttl) {
            warn!(key = %key, "Backend rejected write");
            return Err(CacheError::SetCacheFailure {
                key: key.to_string(),
                value,
                metadata: Box::new(CacheItemMetadata::new(key, expiry, dependency)),
            });
        }

        self.index.record(key, expiry, dependency);
        self.stats.lock().record_write();
        Ok(value)
    }

    /// Drops the record for a key the backend no longer holds.
    fn forget_if_evicted(&self, key: &str) {
        if self.index.remove_if_gone(key, || !self.backend.has(key)) {
            debug!(key = %key, "Dropped record of evicted entry");
        }
    }

    fn delete_canonical(&self, keys: &[String]) -> Result<()> {
        if !self.backend.delete_multiple(keys) {
            warn!(keys = ?keys, "Backend refused delete");
            return Err(CacheError::RemoveCacheFailure {
                keys: keys.to_vec(),
            });
        }
        self.index.remove_many(keys.iter().map(String::as_str));
        Ok(())
    }
}

fn validate_beta(beta: f64) -> Result<f64> {
    if beta.is_nan() || beta < 0.0 {
        return Err(CacheError::InvalidArgument(format!(
            "beta must be a non-negative number, got {}",
            beta
        )));
    }
    Ok(beta)
}

fn normalize_all<I, K>(keys: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = K>,
    K: Into<CacheKey>,
{
    keys.into_iter().map(|key| normalize(&key.into())).collect()
}
