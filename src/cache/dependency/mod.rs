//! Dependency Module
//!
//! Conditions that invalidate cached data before its TTL runs out.
//!
//! A dependency is evaluated when the value is written, capturing a
//! fingerprint of some outside state. On later reads the fingerprint is
//! recomputed and compared with the captured one.

mod reusable;
mod tag;

pub use reusable::ReusableData;
pub use tag::{tag_key, TagDependency, TAG_NAMESPACE};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use parking_lot::RwLock;
use serde_json::{json, Value};

use crate::cache::Cache;

static NEXT_DEPENDENCY_ID: AtomicU64 = AtomicU64::new(0);

/// User function producing a fingerprint.
pub type DependencyCallback = Arc<dyn Fn(&Cache) -> Value + Send + Sync>;

// == Dependency Kind ==
/// The closed set of dependency variants.
#[derive(Clone)]
pub enum DependencyKind {
    /// Fixed snapshot
    Value(Value),
    /// Result of a user function
    Callback(DependencyCallback),
    /// Versions of named tags held in the backend
    Tag(TagDependency),
    /// Modification time of a file
    File(PathBuf),
    /// Changed only when every child changed
    All(Vec<Dependency>),
    /// Changed when at least one child changed
    Any(Vec<Dependency>),
}

// == Dependency ==
pub struct Dependency {
    /// Process-unique, shared by clones
    id: u64,
    kind: DependencyKind,
    /// Fingerprint captured by the last `evaluate`
    data: RwLock<Option<Value>>,
    reusable: bool,
}

impl Dependency {
    fn from_kind(kind: DependencyKind) -> Self {
        Self {
            id: NEXT_DEPENDENCY_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            data: RwLock::new(None),
            reusable: false,
        }
    }

    // == Constructors ==
    pub fn value(value: impl Into<Value>) -> Self {
        Self::from_kind(DependencyKind::Value(value.into()))
    }

    pub fn callback<F>(callback: F) -> Self
    where
        F: Fn(&Cache) -> Value + Send + Sync + 'static,
    {
        Self::from_kind(DependencyKind::Callback(Arc::new(callback)))
    }

    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_kind(DependencyKind::Tag(TagDependency::new(tags)))
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::from_kind(DependencyKind::File(path.as_ref().to_path_buf()))
    }

    pub fn all(children: Vec<Dependency>) -> Self {
        Self::from_kind(DependencyKind::All(children))
    }

    pub fn any(children: Vec<Dependency>) -> Self {
        Self::from_kind(DependencyKind::Any(children))
    }

    /// Memoizes the fingerprint for the current unit of work.
    ///
    /// Until [`Cache::reset_reusable_data`] runs, every dependency with the
    /// same identity sees the first fingerprint computed. Composites hold no
    /// fingerprint of their own, so on `all`/`any` every child is marked
    /// instead. Callback identity is the dependency itself and its clones.
    pub fn reusable(mut self) -> Self {
        self.mark_reusable();
        self
    }

    fn mark_reusable(&mut self) {
        self.reusable = true;
        if let DependencyKind::All(children) | DependencyKind::Any(children) = &mut self.kind {
            for child in children {
                child.mark_reusable();
            }
        }
    }

    // == Accessors ==
    pub fn kind(&self) -> &DependencyKind {
        &self.kind
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            DependencyKind::Value(_) => "value",
            DependencyKind::Callback(_) => "callback",
            DependencyKind::Tag(_) => "tag",
            DependencyKind::File(_) => "file",
            DependencyKind::All(_) => "all",
            DependencyKind::Any(_) => "any",
        }
    }

    pub fn is_reusable(&self) -> bool {
        self.reusable
    }

    /// Fingerprint captured by the last `evaluate`, if any.
    pub fn data(&self) -> Option<Value> {
        self.data.read().clone()
    }

    // == Evaluate ==
    /// Captures the current fingerprint. Composites evaluate every child.
    pub fn evaluate(&self, cache: &Cache) {
        match &self.kind {
            DependencyKind::All(children) | DependencyKind::Any(children) => {
                for child in children {
                    child.evaluate(cache);
                }
            }
            _ => {
                let fingerprint = self.fingerprint(cache);
                *self.data.write() = Some(fingerprint);
            }
        }
    }

    // == Is Changed ==
    /// Recomputes the fingerprint and compares it to the captured one.
    ///
    /// An empty composite never reports a change.
    pub fn is_changed(&self, cache: &Cache) -> bool {
        match &self.kind {
            DependencyKind::All(children) => {
                !children.is_empty() && children.iter().all(|child| child.is_changed(cache))
            }
            DependencyKind::Any(children) => children.iter().any(|child| child.is_changed(cache)),
            _ => {
                let current = self.fingerprint(cache);
                self.data.read().as_ref() != Some(&current)
            }
        }
    }

    fn fingerprint(&self, cache: &Cache) -> Value {
        if !self.reusable {
            return self.generate(cache);
        }

        let hash = self.identity_hash();
        let memo = cache.reusable_data();
        if let Some(data) = memo.get(&hash) {
            return data;
        }
        // Computed outside the memo lock: callbacks may use the cache.
        let data = self.generate(cache);
        memo.store(hash, data.clone());
        data
    }

    fn generate(&self, cache: &Cache) -> Value {
        match &self.kind {
            DependencyKind::Value(value) => value.clone(),
            DependencyKind::Callback(callback) => callback(cache),
            DependencyKind::Tag(tags) => tags.fingerprint(cache),
            DependencyKind::File(path) => file_mtime(path),
            DependencyKind::All(_) | DependencyKind::Any(_) => Value::Null,
        }
    }

    // == Identity ==
    /// Stable description of what this dependency watches.
    fn identity(&self) -> Value {
        match &self.kind {
            DependencyKind::Value(value) => json!({ "value": value }),
            DependencyKind::Callback(_) => json!({ "callback": self.id }),
            DependencyKind::Tag(tags) => json!({ "tag": tags.tags(), "ttl": tags.ttl().as_secs() }),
            DependencyKind::File(path) => json!({ "file": path.to_string_lossy() }),
            DependencyKind::All(children) => {
                json!({ "all": children.iter().map(Dependency::identity).collect::<Vec<_>>() })
            }
            DependencyKind::Any(children) => {
                json!({ "any": children.iter().map(Dependency::identity).collect::<Vec<_>>() })
            }
        }
    }

    fn identity_hash(&self) -> String {
        format!("{:x}", md5::compute(self.identity().to_string()))
    }
}

impl From<TagDependency> for Dependency {
    fn from(tags: TagDependency) -> Self {
        Self::from_kind(DependencyKind::Tag(tags))
    }
}

impl Clone for Dependency {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            kind: self.kind.clone(),
            data: RwLock::new(self.data()),
            reusable: self.reusable,
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("kind", &self.kind_name())
            .field("identity", &self.identity())
            .field("data", &self.data())
            .field("reusable", &self.reusable)
            .finish()
    }
}

fn file_mtime(path: &Path) -> Value {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|d| Value::String(format!("{}.{:09}", d.as_secs(), d.subsec_nanos())))
        .unwrap_or(Value::Null)
}
