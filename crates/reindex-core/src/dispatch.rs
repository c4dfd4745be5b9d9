//! Asynchronous dispatch of walks.
//!
//! [`Dispatcher::reindex_dependents`] returns immediately. Each accepted
//! request becomes a task that waits for one of `max_in_flight` workers and
//! then runs the walk on the runtime's blocking pool with its own session.
//! Up to `max_queued` requests may wait for a worker; past that the newest
//! request is dropped with a warning. Re-loading and overwriting documents
//! makes walks idempotent, so reordering them only delays the index.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore, TryAcquireError};

use crate::engine::ReindexEngine;
use crate::error::Error;
use crate::key::EntityKey;

/// Count of accepted walks that have not finished yet.
#[derive(Debug, Default)]
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

impl Pending {
    fn enter(self: &Arc<Self>) -> PendingGuard {
        self.count.fetch_add(1, Ordering::AcqRel);
        PendingGuard(self.clone())
    }
}

/// Decrements the pending count when the walk task ends, however it ends.
struct PendingGuard(Arc<Pending>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Bounded worker pool with a bounded queue in front of a [`ReindexEngine`].
pub struct Dispatcher {
    engine: Arc<ReindexEngine>,
    runtime: Handle,
    slots: Arc<Semaphore>,
    workers: Arc<Semaphore>,
    pending: Arc<Pending>,
    capacity: usize,
}

impl Dispatcher {
    /// Create a dispatcher spawning onto the given runtime.
    pub fn new(engine: Arc<ReindexEngine>, runtime: Handle) -> Self {
        let workers = engine.config().max_in_flight.max(1);
        let capacity = workers
            .saturating_add(engine.config().max_queued)
            .min(Semaphore::MAX_PERMITS);
        Self {
            engine,
            runtime,
            slots: Arc::new(Semaphore::new(capacity)),
            workers: Arc::new(Semaphore::new(workers)),
            pending: Arc::new(Pending::default()),
            capacity,
        }
    }

    /// Create a dispatcher on the current tokio runtime.
    pub fn current(engine: Arc<ReindexEngine>) -> Result<Self, Error> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Dispatch(format!("no tokio runtime: {}", e)))?;
        Ok(Self::new(engine, runtime))
    }

    /// The engine walks run against.
    pub fn engine(&self) -> &Arc<ReindexEngine> {
        &self.engine
    }

    /// Re-index everything depending on `root`, asynchronously.
    ///
    /// Returns before any query runs. Nothing is reported back to the caller.
    pub fn reindex_dependents(&self, root: EntityKey) {
        let metrics = self.engine.metrics().clone();
        let slot = match self.slots.clone().try_acquire_owned() {
            Ok(slot) => slot,
            Err(TryAcquireError::NoPermits) => {
                tracing::warn!(
                    root = %root,
                    capacity = self.capacity,
                    "reindex queue full, dropping request"
                );
                metrics.walk_dropped();
                return;
            }
            Err(TryAcquireError::Closed) => {
                tracing::warn!(root = %root, "reindex dispatcher shut down, dropping request");
                metrics.walk_dropped();
                return;
            }
        };

        metrics.walk_queued();
        let guard = self.pending.enter();
        let engine = self.engine.clone();
        let workers = self.workers.clone();

        self.runtime.spawn(async move {
            let _guard = guard;
            let _slot = slot;

            let worker = workers.acquire_owned().await;
            engine.metrics().walk_dequeued();
            // Workers are never closed.
            let Ok(_worker) = worker else {
                return;
            };

            let walker = engine.clone();
            let walk_root = root.clone();
            let outcome = tokio::task::spawn_blocking(move || walker.walk(&walk_root)).await;
            if let Err(e) = outcome {
                tracing::error!(root = %root, error = %e, "reindex walk panicked");
                engine.metrics().walk_panicked();
            }
        });
    }

    /// Walks accepted and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.pending.count.load(Ordering::Acquire)
    }

    /// Wait until every accepted walk has finished.
    ///
    /// Requests made while waiting are accepted as usual and waited for too.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.pending.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Refuse further requests. Walks already accepted run to completion.
    pub fn shutdown(&self) {
        self.slots.close();
        tracing::info!(in_flight = self.in_flight(), "reindex dispatcher shut down");
    }
}
