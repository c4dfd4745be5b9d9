//! Collaborator interfaces: the relational store and the full-text index.
//!
//! The engine treats the ORM as an opaque query executor reached through a
//! [`Session`], and the index as an opaque [`IndexSink`].

use serde::Serialize;

use crate::error::{IndexError, StoreError};
use crate::key::{EntityId, EntityKey};
use crate::planner::DependentQuery;

/// When the session writes pending changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// Flush before queries that could observe pending state.
    Auto,
    /// Flush on commit only.
    Commit,
    /// Flush only when asked.
    Manual,
}

/// How the session uses second-level caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Read from and write to caches.
    Normal,
    /// Bypass caches entirely.
    Ignore,
}

/// Session knobs applied while re-indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionMode {
    /// Flush behaviour.
    pub flush: FlushMode,
    /// Cache behaviour.
    pub cache: CacheMode,
}

impl SessionMode {
    /// Auto-flush and bypass caches.
    pub fn reindexing() -> Self {
        Self {
            flush: FlushMode::Auto,
            cache: CacheMode::Ignore,
        }
    }
}

impl Default for SessionMode {
    fn default() -> Self {
        Self::reindexing()
    }
}

/// A persisted entity as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    key: EntityKey,
    document: serde_json::Value,
}

impl Entity {
    /// Create an entity from its key and persisted attributes.
    pub fn new(key: EntityKey, document: serde_json::Value) -> Self {
        Self { key, document }
    }

    /// `(type, id)` of the entity.
    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    /// Entity type name.
    pub fn entity_type(&self) -> &str {
        &self.key.entity_type
    }

    /// Entity id.
    pub fn id(&self) -> EntityId {
        self.key.id
    }

    /// Persisted attributes.
    pub fn document(&self) -> &serde_json::Value {
        &self.document
    }
}

/// One row returned by a dependents query.
///
/// Scalar queries yield entities; join queries may yield tuples whose first
/// component is the owner.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// A managed entity.
    Entity(EntityKey),
    /// A tuple of row components.
    Tuple(Vec<Row>),
    /// Any other projected value.
    Value(serde_json::Value),
}

impl Row {
    /// The owner entity of this row, if it is one.
    pub fn into_owner(self) -> Option<EntityKey> {
        match self {
            Row::Entity(key) => Some(key),
            Row::Tuple(items) => match items.into_iter().next() {
                Some(Row::Entity(key)) => Some(key),
                _ => None,
            },
            Row::Value(_) => None,
        }
    }
}

/// A relational session, owned by exactly one walk.
pub trait Session {
    /// Apply session knobs.
    fn configure(&mut self, mode: SessionMode);

    /// Make pending writes visible to subsequent reads and queries.
    fn flush(&mut self) -> Result<(), StoreError>;

    /// Read an entity; `None` when no row exists.
    fn get(&mut self, key: &EntityKey) -> Result<Option<Entity>, StoreError>;

    /// Read an entity, failing when it cannot be materialised.
    fn load(&mut self, key: &EntityKey) -> Result<Entity, StoreError>;

    /// Execute a dependents query.
    fn find(&mut self, query: &DependentQuery) -> Result<Vec<Row>, StoreError>;

    /// Release the session.
    fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Opens isolated sessions; never joins a caller's transaction.
pub trait SessionFactory: Send + Sync {
    /// Open a fresh session.
    fn open_session(&self) -> Result<Box<dyn Session>, StoreError>;
}

/// Full-text index sink.
///
/// Indexing the same `(type, id)` again overwrites the prior document.
/// Implementations must be thread-safe.
pub trait IndexSink: Send + Sync {
    /// Write or overwrite the entity's document.
    fn index(&self, entity: &Entity) -> Result<(), IndexError>;
}
