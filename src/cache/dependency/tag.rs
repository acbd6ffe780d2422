//! Tag Dependency
//!
//! Each tag owns a version string stored in the backend under a hashed key.
//! Invalidating a tag writes a new version, so every entry that captured the
//! old one reads as changed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::{info, warn};

use crate::cache::{Cache, Ttl};
use crate::error::{CacheError, Result};

/// Namespace mixed into every tag storage key
pub const TAG_NAMESPACE: &str = "tagcache:tag";

static TAG_SEQUENCE: AtomicU64 = AtomicU64::new(0);

// == Tag Dependency ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDependency {
    /// Sorted, deduplicated tag names
    tags: Vec<String>,
    /// Lifetime of tag versions written by this dependency
    ttl: Ttl,
}

impl TagDependency {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        tags.sort();
        tags.dedup();
        Self {
            tags,
            ttl: Ttl::forever(),
        }
    }

    /// Sets the lifetime of tag versions. Only positive lifetimes or forever
    /// are accepted.
    pub fn with_ttl(mut self, ttl: Ttl) -> Result<Self> {
        if let Some(secs) = ttl.as_secs() {
            if secs <= 0 {
                return Err(CacheError::InvalidArgument(format!(
                    "tag TTL must be positive or forever, got {}s",
                    secs
                )));
            }
        }
        self.ttl = ttl;
        Ok(self)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    // == Fingerprint ==
    /// Current version of every tag, in tag order.
    ///
    /// Tags with no stored version get a fresh one written immediately, so
    /// the first reader sets the baseline.
    pub(crate) fn fingerprint(&self, cache: &Cache) -> Value {
        let keys: Vec<String> = self.tags.iter().map(|tag| tag_key(tag)).collect();
        let stored = cache.backend().get_multiple(&keys);

        let mut fresh: HashMap<String, Value> = HashMap::new();
        let versions: Vec<Value> = keys
            .iter()
            .map(|key| match stored.get(key).cloned().flatten() {
                Some(version) => version,
                None => {
                    let version = Value::String(next_version());
                    fresh.insert(key.clone(), version.clone());
                    version
                }
            })
            .collect();

        if !fresh.is_empty() && !cache.backend().set_multiple(&fresh, self.ttl) {
            warn!(tags = ?self.tags, "Failed to store baseline tag versions");
        }

        Value::Array(versions)
    }

    // == Invalidate ==
    /// Writes a new version for each tag. Entries depending on any of them
    /// become stale on their next read.
    pub fn invalidate<S: AsRef<str>>(cache: &Cache, tags: &[S]) -> Result<()> {
        if tags.is_empty() {
            return Ok(());
        }

        let versions: HashMap<String, Value> = tags
            .iter()
            .map(|tag| (tag_key(tag.as_ref()), Value::String(next_version())))
            .collect();

        if !cache.backend().set_multiple(&versions, Ttl::forever()) {
            return Err(CacheError::SetMultipleCacheFailure {
                keys: versions.into_keys().collect(),
            });
        }

        info!("Invalidated {} tag(s)", tags.len());
        Ok(())
    }
}

/// Storage key holding the version of `tag`.
pub fn tag_key(tag: &str) -> String {
    let canonical = Value::Array(vec![TAG_NAMESPACE.into(), tag.into()]);
    format!("{:x}", md5::compute(canonical.to_string()))
}

/// Timestamp plus a process-wide sequence, unique even within one microsecond.
fn next_version() -> String {
    format!(
        "{}-{}",
        chrono::Utc::now().timestamp_micros(),
        TAG_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    )
}
