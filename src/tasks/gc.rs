//! Garbage Collection Task
//!
//! Background task that periodically removes expired cache data.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::Cache;

/// Spawns a background task that periodically collects expired entries.
///
/// Each pass purges expired data from the backend and prunes expired or
/// evicted records from the metadata index. Passes run on the blocking pool
/// since the file backend walks its directory. Abort the returned handle on
/// shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(Cache::new(backend));
/// let gc_handle = spawn_gc_task(cache.clone(), 1);
/// // Later, during shutdown:
/// gc_handle.abort();
/// ```
pub fn spawn_gc_task(cache: Arc<Cache>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting garbage collection task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let pass = Arc::clone(&cache);
            let report = match tokio::task::spawn_blocking(move || pass.collect_garbage()).await {
                Ok(report) => report,
                Err(e) => {
                    warn!("Garbage collection pass failed: {}", e);
                    continue;
                }
            };

            if report.purged > 0 || report.pruned > 0 || report.orphaned > 0 {
                info!(
                    purged = report.purged,
                    pruned = report.pruned,
                    orphaned = report.orphaned,
                    "Garbage collection removed expired data"
                );
            } else {
                debug!("Garbage collection: nothing expired");
            }
        }
    })
}
