//! Bounded-concurrency request scheduler.
//!
//! At most `capacity` submitted tasks run at once; the rest wait in submission order
//! (tokio's semaphore is fair). A task that panics resolves to `None` and
//! releases its slot like any other, so one bad lookup cannot stall the queue.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::warn;

/// FIFO scheduler with a fixed concurrency cap
#[derive(Debug, Clone)]
pub struct RequestScheduler {
    permits: Arc<Semaphore>,
    capacity: usize,
    active: Arc<AtomicUsize>,
    queued: Arc<AtomicUsize>,
}

/// Decrements a counter when dropped
struct CountGuard(Arc<AtomicUsize>);

impl CountGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for CountGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RequestScheduler {
    /// Create a scheduler running at most `max_concurrent` tasks (minimum 1)
    pub fn new(max_concurrent: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            active: Arc::new(AtomicUsize::new(0)),
            queued: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Run `task` once a slot is free and return its output.
    ///
    /// `None` when the task panicked. The slot stays taken until the task itself
    /// finishes, even if the caller stops waiting.
    pub async fn submit<F, T>(&self, task: F) -> Option<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = {
            let _waiting = CountGuard::enter(&self.queued);
            Arc::clone(&self.permits).acquire_owned().await
        };
        let permit = match permit {
            Ok(permit) => permit,
            Err(e) => {
                warn!(error = %e, "Scheduler closed");
                return None;
            }
        };

        let active = Arc::clone(&self.active);
        let handle = tokio::spawn(async move {
            let _permit = permit;
            let _running = CountGuard::enter(&active);
            task.await
        });

        match handle.await {
            Ok(output) => Some(output),
            Err(e) => {
                warn!(error = %e, "Scheduled task aborted");
                None
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks currently running
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Submissions waiting for a slot
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }
}

impl Default for RequestScheduler {
    fn default() -> Self {
        Self::new(3)
    }
}
