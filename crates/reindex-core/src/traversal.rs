//! Depth-first re-indexing of dependent entities.
//!
//! A walk starts at one mutated entity, re-loads and re-indexes it, then
//! follows every edge registered under its type: the planned query returns
//! the owners referencing it and the walk recurses into each. Every
//! `(type, id)` is entered at most once per walk, which cuts cycles and
//! diamonds without touching the store again.
//!
//! Failures on a single entity are logged and recorded in the
//! [`WalkReport`]; they never abort the walk.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::catalog::Registry;
use crate::graph::DependencyGraph;
use crate::key::EntityKey;
use crate::planner::DependentQuery;
use crate::store::{IndexSink, Row, Session};

/// Lifecycle of a walk. There is no failed state: a walk that contained
/// errors still completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkState {
    /// Accepted, waiting for a worker.
    Queued,
    /// Traversing.
    Running,
    /// Finished.
    Completed,
}

/// Classification of a contained failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The walk could not open its own session.
    SessionUnavailable,
    /// Pending writes could not be flushed before loading.
    FlushFailure,
    /// Neither `get` nor the `load` fallback produced the entity.
    EntityNotFound,
    /// The index sink refused the entity.
    IndexFailure,
    /// A dependents query failed.
    QueryFailure,
    /// An edge's owner type is not in the registry.
    MissingRegistryEntry,
    /// The branch exceeded the configured depth.
    DepthExceeded,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::SessionUnavailable => "session_unavailable",
            FailureKind::FlushFailure => "flush_failure",
            FailureKind::EntityNotFound => "entity_not_found",
            FailureKind::IndexFailure => "index_failure",
            FailureKind::QueryFailure => "query_failure",
            FailureKind::MissingRegistryEntry => "missing_registry_entry",
            FailureKind::DepthExceeded => "depth_exceeded",
        };
        f.write_str(name)
    }
}

/// A failure contained during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkFailure {
    /// What went wrong.
    pub kind: FailureKind,
    /// Entity being processed when it happened.
    pub key: EntityKey,
    /// Collaborator message.
    pub message: String,
}

impl WalkFailure {
    /// Create a failure record.
    pub fn new(kind: FailureKind, key: EntityKey, message: impl ToString) -> Self {
        Self {
            kind,
            key,
            message: message.to_string(),
        }
    }
}

/// Outcome of one walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkReport {
    /// Mutated entity the walk started from.
    pub root: EntityKey,
    /// Final state.
    pub state: WalkState,
    /// Entities handed to the index sink, in pre-order.
    pub indexed: Vec<EntityKey>,
    /// Contained failures, in occurrence order.
    pub failures: Vec<WalkFailure>,
    /// Number of dependents queries executed.
    pub queries: usize,
}

impl WalkReport {
    /// Create an empty report for a walk that has not started.
    pub fn new(root: EntityKey) -> Self {
        Self {
            root,
            state: WalkState::Queued,
            indexed: Vec::new(),
            failures: Vec::new(),
            queries: 0,
        }
    }

    /// Number of entities indexed.
    pub fn size(&self) -> usize {
        self.indexed.len()
    }

    /// Failures of one kind.
    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &WalkFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }
}

/// One depth-first traversal over a single session.
pub struct Walker<'a> {
    registry: &'a Registry,
    graph: &'a DependencyGraph,
    sink: &'a dyn IndexSink,
    session: &'a mut dyn Session,
    max_depth: usize,
    visited: HashSet<EntityKey>,
    indexed: Vec<EntityKey>,
    failures: Vec<WalkFailure>,
    queries: usize,
}

impl<'a> Walker<'a> {
    /// Create a walker. The session is used exclusively by this walk.
    pub fn new(
        registry: &'a Registry,
        graph: &'a DependencyGraph,
        sink: &'a dyn IndexSink,
        session: &'a mut dyn Session,
        max_depth: usize,
    ) -> Self {
        Self {
            registry,
            graph,
            sink,
            session,
            max_depth,
            visited: HashSet::new(),
            indexed: Vec::new(),
            failures: Vec::new(),
            queries: 0,
        }
    }

    /// Walk from `root` and return the report.
    pub fn run(mut self, root: &EntityKey) -> WalkReport {
        self.walk(root, 0);
        WalkReport {
            root: root.clone(),
            state: WalkState::Completed,
            indexed: self.indexed,
            failures: self.failures,
            queries: self.queries,
        }
    }

    fn walk(&mut self, key: &EntityKey, depth: usize) {
        if self.visited.contains(key) {
            tracing::debug!(entity = %key, "already re-indexed, skipping");
            return;
        }
        if depth > self.max_depth {
            tracing::warn!(entity = %key, depth, "maximum walk depth exceeded, pruning branch");
            self.record(WalkFailure::new(
                FailureKind::DepthExceeded,
                key.clone(),
                format!("depth {} exceeds {}", depth, self.max_depth),
            ));
            return;
        }
        self.visited.insert(key.clone());

        if let Err(failure) = self.reindex(key) {
            tracing::info!(
                entity = %key,
                kind = %failure.kind,
                error = %failure.message,
                "failed to re-index"
            );
            self.record(failure);
        }

        let registry = self.registry;
        let graph = self.graph;
        for edge in graph.get(&key.entity_type) {
            let Some(owner) = registry.lookup_by_type(&edge.owner_type) else {
                tracing::warn!(
                    entity = %key,
                    owner = %edge.owner_type,
                    "owner type of dependency edge is not registered"
                );
                self.record(WalkFailure::new(
                    FailureKind::MissingRegistryEntry,
                    key.clone(),
                    format!("{} is not registered", edge.owner_type),
                ));
                return;
            };

            let query = DependentQuery::plan(edge, owner, key.id);
            tracing::debug!(query = %query, id = %key.id, "querying dependents");
            self.queries += 1;

            let rows = match self.session.find(&query) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::info!(
                        entity = %key,
                        query = %query,
                        error = %e,
                        "dependents query failed"
                    );
                    self.record(WalkFailure::new(FailureKind::QueryFailure, key.clone(), e));
                    continue;
                }
            };

            for owner_key in rows.into_iter().filter_map(Row::into_owner) {
                self.walk(&owner_key, depth + 1);
            }
        }
    }

    /// Flush, re-load and index one entity.
    fn reindex(&mut self, key: &EntityKey) -> Result<(), WalkFailure> {
        self.session
            .flush()
            .map_err(|e| WalkFailure::new(FailureKind::FlushFailure, key.clone(), e))?;

        let entity = match self.session.get(key) {
            Ok(Some(entity)) => entity,
            Ok(None) => self
                .session
                .load(key)
                .map_err(|e| WalkFailure::new(FailureKind::EntityNotFound, key.clone(), e))?,
            Err(e) => return Err(WalkFailure::new(FailureKind::EntityNotFound, key.clone(), e)),
        };

        self.sink
            .index(&entity)
            .map_err(|e| WalkFailure::new(FailureKind::IndexFailure, key.clone(), e))?;

        tracing::debug!(entity = %key, "entity added to index");
        self.indexed.push(key.clone());
        Ok(())
    }

    fn record(&mut self, failure: WalkFailure) {
        self.failures.push(failure);
    }
}
