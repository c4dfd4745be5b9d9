//! Dependent-object reindexing.
//!
//! Keeps a full-text index consistent when entities embed other entities:
//! after entity `A` changes, every indexed entity whose document embeds `A`
//! is re-indexed, transitively, exactly once per `(type, id)`, off the
//! caller's thread.
//!
//! The pieces, leaves first:
//!
//! - [`catalog`]: the registry of managed entity types and their declared fields.
//! - [`graph`]: the reverse dependency graph built once from the registry.
//! - [`planner`]: the relational query enumerating the owners of a mutated entity.
//! - [`traversal`]: the depth-first walk that re-loads, indexes and recurses.
//! - [`dispatch`]: the bounded pool that detaches walks from the caller.

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod graph;
pub mod key;
pub mod memory;
pub mod metrics;
pub mod planner;
pub mod store;
pub mod traversal;

pub use catalog::{
    CollectionKind, DependencyMarker, ElementType, EntityDef, FieldDef, FieldType, Registry,
    RegistryBuilder, RegistryEntry, ScalarType, SchemaDeclaration,
};
pub use config::ReindexConfig;
pub use dispatch::Dispatcher;
pub use engine::ReindexEngine;
pub use error::{Error, IndexError, StoreError};
pub use graph::{DependencyEdge, DependencyGraph, GraphBuilder, SkipReason, SkippedField};
pub use key::{EntityId, EntityKey};
pub use memory::{MemoryStore, RecordingSink, StoredEntity};
pub use metrics::{MetricsSnapshot, ReindexMetrics, SharedMetrics};
pub use planner::{DependentQuery, JoinForm};
pub use store::{CacheMode, Entity, FlushMode, IndexSink, Row, Session, SessionFactory, SessionMode};
pub use traversal::{FailureKind, WalkFailure, WalkReport, WalkState, Walker};
