//! Cache Module
//!
//! Key normalization, freshness metadata, dependencies and the cache facade.

mod dependency;
mod facade;
mod index;
mod key;
mod metadata;
mod stats;
mod ttl;


// Re-export public types
pub use dependency::{
    tag_key, Dependency, DependencyCallback, DependencyKind, ReusableData, TagDependency,
    TAG_NAMESPACE,
};
pub use facade::{Cache, GcReport, DEFAULT_BETA};
pub use index::CacheMetadataIndex;
pub use key::{normalize, CacheKey, MAX_PLAIN_KEY_LENGTH};
pub use metadata::{
    current_timestamp_ms, CacheItemMetadata, FixedRandom, RandomSource, ThreadRandom,
};
pub use stats::CacheStats;
pub use ttl::Ttl;
