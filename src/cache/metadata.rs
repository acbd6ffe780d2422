//! Cache Item Metadata Module
//!
//! Per-key freshness record kept beside the raw stored value, with
//! probabilistic early expiration.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::{Cache, Dependency};
use crate::error::{CacheError, Result};

// == Random Source ==
/// Uniform draws in `(0, 1]` for early expiration.
pub trait RandomSource: Send + Sync {
    fn next_unit(&self) -> f64;
}

/// Thread-local generator from `rand`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        // rand yields [0, 1)
        1.0 - rand::random::<f64>()
    }
}

/// Always returns the same draw. Useful for pinning boundary behavior.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_unit(&self) -> f64 {
        self.0
    }
}

// == Cache Item Metadata ==
/// Freshness record for one canonical key.
#[derive(Clone)]
pub struct CacheItemMetadata {
    key: String,
    /// Absolute expiry (Unix milliseconds), None = never expires by time
    expiry: Option<u64>,
    /// Anchor for early expiration (Unix milliseconds)
    created_at: u64,
    dependency: Option<Arc<Dependency>>,
}

impl CacheItemMetadata {
    // == Constructor ==
    pub fn new(
        key: impl Into<String>,
        expiry: Option<u64>,
        dependency: Option<Arc<Dependency>>,
    ) -> Self {
        Self::created_at(key, current_timestamp_ms(), expiry, dependency)
    }

    /// Creates a record with an explicit creation time.
    pub fn created_at(
        key: impl Into<String>,
        created_at: u64,
        expiry: Option<u64>,
        dependency: Option<Arc<Dependency>>,
    ) -> Self {
        Self {
            key: key.into(),
            expiry,
            created_at,
            dependency,
        }
    }

    // == Accessors ==
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn expiry(&self) -> Option<u64> {
        self.expiry
    }

    pub fn creation_time(&self) -> u64 {
        self.created_at
    }

    pub fn dependency(&self) -> Option<&Arc<Dependency>> {
        self.dependency.as_ref()
    }

    // == Update ==
    /// Replaces expiry and dependency together and restarts the staleness clock.
    pub fn update(&mut self, expiry: Option<u64>, dependency: Option<Arc<Dependency>>) {
        self.expiry = expiry;
        self.dependency = dependency;
        self.created_at = current_timestamp_ms();
    }

    // == Hard Expiry ==
    /// True once the absolute expiry has been reached.
    pub fn is_hard_expired(&self, now_ms: u64) -> bool {
        matches!(self.expiry, Some(expiry) if now_ms >= expiry)
    }

    // == Expired ==
    /// Time-based expiry with early expiration, evaluated at the current clock.
    pub fn expired(&self, beta: f64, random: &dyn RandomSource) -> Result<bool> {
        self.expired_at(current_timestamp_ms(), beta, random)
    }

    /// Time-based expiry evaluated at `now_ms`.
    ///
    /// Before the hard expiry the entry still expires early when
    /// `now - delta * beta * ln(r) >= expiry`, where `delta` is the age of the
    /// record and `r` is drawn from `(0, 1]`. `beta = 0` turns this off.
    pub fn expired_at(&self, now_ms: u64, beta: f64, random: &dyn RandomSource) -> Result<bool> {
        if beta.is_nan() || beta < 0.0 {
            return Err(CacheError::InvalidArgument(format!(
                "beta must be a non-negative number, got {}",
                beta
            )));
        }

        let Some(expiry) = self.expiry else {
            return Ok(false);
        };

        if now_ms >= expiry {
            return Ok(true);
        }

        if beta == 0.0 {
            return Ok(false);
        }

        let delta = now_ms.saturating_sub(self.created_at) as f64;
        let draw = random.next_unit().clamp(f64::MIN_POSITIVE, 1.0);
        let shifted = now_ms as f64 - delta * beta * draw.ln();

        Ok(shifted >= expiry as f64)
    }

    // == Staleness ==
    /// Expired by time, or invalidated by its dependency.
    pub fn is_stale(&self, beta: f64, cache: &Cache) -> Result<bool> {
        if self.dependency_changed(cache) {
            return Ok(true);
        }
        self.expired(beta, cache.random_source())
    }

    /// True when the attached dependency reports a change.
    pub fn dependency_changed(&self, cache: &Cache) -> bool {
        self.dependency
            .as_ref()
            .is_some_and(|dependency| dependency.is_changed(cache))
    }
}

impl fmt::Debug for CacheItemMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheItemMetadata")
            .field("key", &self.key)
            .field("expiry", &self.expiry)
            .field("created_at", &self.created_at)
            .field("dependency", &self.dependency.as_ref().map(|d| d.kind_name()))
            .finish()
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
