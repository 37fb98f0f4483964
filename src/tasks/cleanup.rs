//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired entries out of caches
//! that are never read again. The returned handle owns the task: `stop`
//! ends it and dropping the handle aborts it.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{NamedCaches, SharedCache};

// == Sweep ==
/// Anything whose expired entries can be removed in one pass.
pub trait Sweep: Send + Sync {
    /// Removes expired entries and returns how many were removed.
    fn sweep(&self) -> usize;
}

impl<V: Clone + Send> Sweep for SharedCache<V> {
    fn sweep(&self) -> usize {
        self.cleanup()
    }
}

impl Sweep for NamedCaches {
    fn sweep(&self) -> usize {
        self.cleanup_all()
    }
}

// == Cleanup Task ==
pub struct CleanupTask;

impl CleanupTask {
    /// Spawns the sweeper. The first sweep runs one `interval` after start.
    ///
    /// A zero interval is raised to one millisecond.
    pub fn start(targets: Vec<Arc<dyn Sweep>>, interval: Duration) -> CleanupHandle {
        let interval = interval.max(Duration::from_millis(1));
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            info!(
                "Starting TTL cleanup task for {} cache(s) every {:?}",
                targets.len(),
                interval
            );

            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let removed: usize = targets.iter().map(|target| target.sweep()).sum();
                        if removed > 0 {
                            info!("TTL cleanup: removed {} expired entries", removed);
                        } else {
                            debug!("TTL cleanup: no expired entries found");
                        }
                    }
                }
            }

            info!("TTL cleanup task stopped");
        });

        CleanupHandle {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Sweeps the four named caches on the configured interval.
    pub fn start_named(caches: &NamedCaches, interval: Duration) -> CleanupHandle {
        Self::start(vec![Arc::new(caches.clone())], interval)
    }

    /// Convenience for a single shared cache.
    pub fn start_single(cache: &SharedCache<Value>, interval: Duration) -> CleanupHandle {
        Self::start(vec![Arc::new(cache.clone())], interval)
    }
}

// == Cleanup Handle ==
/// Owner of a running cleanup task.
#[derive(Debug)]
pub struct CleanupHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CleanupHandle {
    /// Signals the task and waits until it has exited.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            // The task may already be gone
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    warn!("TTL cleanup task ended abnormally: {}", err);
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for CleanupHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
