//! Tagcache - a dependency-aware cache
//!
//! Caches JSON values over pluggable storage backends. Entries can depend on
//! tags, files, callbacks or fixed values and are rejected once their
//! dependency changes. `get_or_set` regenerates hot keys early to spread
//! recomputation.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::Cache;
pub use config::Config;
pub use tasks::spawn_gc_task;
