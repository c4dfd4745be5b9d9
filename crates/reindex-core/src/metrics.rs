//! Reindex counters.
//!
//! Walk lifecycle gauges (queued, running) and totals, plus per-type indexed
//! counts and per-kind failure counts.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::traversal::{FailureKind, WalkReport};

/// Counters shared by the engine and the dispatcher.
#[derive(Debug, Default)]
pub struct ReindexMetrics {
    walks_dispatched: AtomicU64,
    walks_dropped: AtomicU64,
    walks_queued: AtomicU64,
    walks_running: AtomicU64,
    walks_completed: AtomicU64,
    walks_panicked: AtomicU64,
    entities_indexed: AtomicU64,
    queries_executed: AtomicU64,
    indexed_by_type: DashMap<String, u64>,
    failures_by_kind: DashMap<FailureKind, u64>,
}

/// Shared metrics handle.
pub type SharedMetrics = Arc<ReindexMetrics>;

impl ReindexMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// A walk was accepted by the dispatcher.
    pub fn walk_queued(&self) {
        self.walks_dispatched.fetch_add(1, Ordering::Relaxed);
        self.walks_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// A walk was refused by the dispatcher.
    pub fn walk_dropped(&self) {
        self.walks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// A queued walk was picked up by a worker.
    pub fn walk_dequeued(&self) {
        self.walks_queued.fetch_sub(1, Ordering::Relaxed);
    }

    /// A walk started running.
    pub fn walk_started(&self) {
        self.walks_running.fetch_add(1, Ordering::Relaxed);
    }

    /// A walk completed.
    pub fn walk_completed(&self, report: &WalkReport) {
        self.walks_running.fetch_sub(1, Ordering::Relaxed);
        self.walks_completed.fetch_add(1, Ordering::Relaxed);
        self.entities_indexed
            .fetch_add(report.indexed.len() as u64, Ordering::Relaxed);
        self.queries_executed
            .fetch_add(report.queries as u64, Ordering::Relaxed);

        for key in &report.indexed {
            *self.indexed_by_type.entry(key.entity_type.clone()).or_insert(0) += 1;
        }
        for failure in &report.failures {
            *self.failures_by_kind.entry(failure.kind).or_insert(0) += 1;
        }
    }

    /// A running walk unwound instead of completing.
    pub fn walk_panicked(&self) {
        self.walks_running.fetch_sub(1, Ordering::Relaxed);
        self.walks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Walks currently queued or running.
    pub fn in_flight(&self) -> u64 {
        self.walks_queued.load(Ordering::Relaxed) + self.walks_running.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            walks_dispatched: self.walks_dispatched.load(Ordering::Relaxed),
            walks_dropped: self.walks_dropped.load(Ordering::Relaxed),
            walks_queued: self.walks_queued.load(Ordering::Relaxed),
            walks_running: self.walks_running.load(Ordering::Relaxed),
            walks_completed: self.walks_completed.load(Ordering::Relaxed),
            walks_panicked: self.walks_panicked.load(Ordering::Relaxed),
            entities_indexed: self.entities_indexed.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            indexed_by_type: self
                .indexed_by_type
                .iter()
                .map(|e| (e.key().clone(), *e.value()))
                .collect(),
            failures_by_kind: self
                .failures_by_kind
                .iter()
                .map(|e| (e.key().to_string(), *e.value()))
                .collect(),
        }
    }
}

/// Serializable copy of [`ReindexMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Walks accepted by the dispatcher.
    pub walks_dispatched: u64,
    /// Walks refused because the pool was saturated or closed.
    pub walks_dropped: u64,
    /// Walks accepted but not yet running.
    pub walks_queued: u64,
    /// Walks currently running.
    pub walks_running: u64,
    /// Walks finished.
    pub walks_completed: u64,
    /// Walks that panicked before finishing.
    pub walks_panicked: u64,
    /// Entities handed to the index sink successfully.
    pub entities_indexed: u64,
    /// Dependents queries executed.
    pub queries_executed: u64,
    /// Indexed entities per type.
    pub indexed_by_type: BTreeMap<String, u64>,
    /// Contained failures per kind.
    pub failures_by_kind: BTreeMap<String, u64>,
}
