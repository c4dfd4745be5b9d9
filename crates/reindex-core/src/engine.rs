//! The reindex engine service.
//!
//! Owns the registry, the dependency graph built from it, and the two
//! collaborators. Constructed once by the composition root after the
//! registry is complete; the graph never changes afterwards.

use std::sync::Arc;

use crate::catalog::Registry;
use crate::config::ReindexConfig;
use crate::graph::DependencyGraph;
use crate::key::EntityKey;
use crate::metrics::{ReindexMetrics, SharedMetrics};
use crate::store::{IndexSink, SessionFactory};
use crate::traversal::{FailureKind, WalkFailure, WalkReport, WalkState, Walker};

/// Dependent-object reindexing service.
pub struct ReindexEngine {
    registry: Arc<Registry>,
    graph: Arc<DependencyGraph>,
    sessions: Arc<dyn SessionFactory>,
    sink: Arc<dyn IndexSink>,
    config: ReindexConfig,
    metrics: SharedMetrics,
}

impl ReindexEngine {
    /// Build the dependency graph from `registry` and wire the collaborators.
    pub fn new(
        registry: Registry,
        sessions: Arc<dyn SessionFactory>,
        sink: Arc<dyn IndexSink>,
        config: ReindexConfig,
    ) -> Self {
        let graph = DependencyGraph::from_registry(&registry);
        tracing::info!(
            entities = registry.len(),
            edges = graph.edge_count(),
            "reindex engine ready"
        );
        Self::from_parts(Arc::new(registry), Arc::new(graph), sessions, sink, config)
    }

    /// Wire an engine from an already built registry and graph.
    pub fn from_parts(
        registry: Arc<Registry>,
        graph: Arc<DependencyGraph>,
        sessions: Arc<dyn SessionFactory>,
        sink: Arc<dyn IndexSink>,
        config: ReindexConfig,
    ) -> Self {
        Self {
            registry,
            graph,
            sessions,
            sink,
            config,
            metrics: Arc::new(ReindexMetrics::new()),
        }
    }

    /// The registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The dependency graph.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// The configuration.
    pub fn config(&self) -> &ReindexConfig {
        &self.config
    }

    /// Shared counters.
    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Run one walk synchronously on the calling thread.
    ///
    /// Opens an isolated session, walks from `root`, closes the session.
    /// Never fails: problems are logged and returned in the report.
    pub fn walk(&self, root: &EntityKey) -> WalkReport {
        self.metrics.walk_started();
        let report = self.walk_in_session(root);
        if report.size() >= self.config.bulk_report_threshold {
            tracing::info!(
                root = %root,
                size = report.size(),
                "re-indexing of dependent objects done"
            );
        }
        self.metrics.walk_completed(&report);
        report
    }

    fn walk_in_session(&self, root: &EntityKey) -> WalkReport {
        let mut session = match self.sessions.open_session() {
            Ok(session) => session,
            Err(e) => {
                tracing::info!(root = %root, error = %e, "could not open reindex session");
                let mut report = WalkReport::new(root.clone());
                report
                    .failures
                    .push(WalkFailure::new(FailureKind::SessionUnavailable, root.clone(), e));
                report.state = WalkState::Completed;
                return report;
            }
        };
        session.configure(self.config.session_mode);

        let report = Walker::new(
            &self.registry,
            &self.graph,
            self.sink.as_ref(),
            session.as_mut(),
            self.config.max_depth,
        )
        .run(root);

        if let Err(e) = session.close() {
            tracing::debug!(root = %root, error = %e, "closing reindex session failed");
        }
        report
    }
}
