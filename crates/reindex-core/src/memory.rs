//! In-process reference store and index sinks.
//!
//! [`MemoryStore`] implements the session collaborator over a map of
//! entities and their links. Scalar-edge queries yield entity rows;
//! collection-edge queries yield `(owner, related)` tuples like an ORM join.
//! [`RecordingSink`] collects indexed keys and can be told to fail or to be
//! slow.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{Error, IndexError, StoreError};
use crate::key::{EntityId, EntityKey};
use crate::planner::{DependentQuery, JoinForm};
use crate::store::{Entity, IndexSink, Row, Session, SessionFactory, SessionMode};

/// Value of a reference field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Link {
    /// Single reference.
    One(EntityKey),
    /// Set or sequence of references.
    Many(Vec<EntityKey>),
}

impl Link {
    fn targets(&self) -> &[EntityKey] {
        match self {
            Link::One(key) => std::slice::from_ref(key),
            Link::Many(keys) => keys,
        }
    }
}

/// A stored row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredEntity {
    /// Plain attributes, copied into the loaded entity's document.
    #[serde(default)]
    pub attributes: serde_json::Value,
    /// Reference fields by field name.
    #[serde(default)]
    pub links: BTreeMap<String, Link>,
}

impl StoredEntity {
    /// Create a row with the given attributes and no links.
    pub fn new(attributes: serde_json::Value) -> Self {
        Self {
            attributes,
            links: BTreeMap::new(),
        }
    }

    /// Add a single reference.
    pub fn with_link(mut self, field: impl Into<String>, target: EntityKey) -> Self {
        self.links.insert(field.into(), Link::One(target));
        self
    }

    /// Add a collection of references.
    pub fn with_links(
        mut self,
        field: impl Into<String>,
        targets: impl IntoIterator<Item = EntityKey>,
    ) -> Self {
        self.links
            .insert(field.into(), Link::Many(targets.into_iter().collect()));
        self
    }
}

/// JSON fixture: a list of rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    /// Rows to load.
    pub entities: Vec<FixtureEntity>,
}

/// One fixture row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureEntity {
    /// Entity type.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Entity id.
    pub id: EntityId,
    /// Row contents.
    #[serde(flatten)]
    pub row: StoredEntity,
}

#[derive(Debug, Default)]
struct StoreInner {
    rows: RwLock<BTreeMap<EntityKey, StoredEntity>>,
    failing_queries: RwLock<HashSet<String>>,
    failing_flush: RwLock<bool>,
    sessions_opened: AtomicUsize,
    flushes: AtomicUsize,
    last_mode: Mutex<Option<SessionMode>>,
    executed: Mutex<Vec<(String, EntityId)>>,
}

/// Shared in-memory relational store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON fixture.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let fixture: Fixture = serde_json::from_str(json)?;
        let store = Self::new();
        for entity in fixture.entities {
            store.insert(EntityKey::new(entity.entity_type, entity.id), entity.row);
        }
        Ok(store)
    }

    /// Load a store from a JSON fixture file.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Insert or replace a row.
    pub fn insert(&self, key: EntityKey, row: StoredEntity) {
        self.inner.rows.write().insert(key, row);
    }

    /// Remove a row.
    pub fn remove(&self, key: &EntityKey) -> Option<StoredEntity> {
        self.inner.rows.write().remove(key)
    }

    /// Check if a row exists.
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.inner.rows.read().contains_key(key)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.inner.rows.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.rows.read().is_empty()
    }

    /// Make every dependents query against `owner_type` fail.
    pub fn fail_queries_for(&self, owner_type: impl Into<String>) {
        self.inner.failing_queries.write().insert(owner_type.into());
    }

    /// Make every flush fail.
    pub fn fail_flushes(&self, fail: bool) {
        *self.inner.failing_flush.write() = fail;
    }

    /// Sessions opened so far.
    pub fn sessions_opened(&self) -> usize {
        self.inner.sessions_opened.load(Ordering::SeqCst)
    }

    /// Flushes performed so far, across sessions.
    pub fn flushes(&self) -> usize {
        self.inner.flushes.load(Ordering::SeqCst)
    }

    /// Mode applied by the most recently configured session.
    pub fn last_session_mode(&self) -> Option<SessionMode> {
        *self.inner.last_mode.lock()
    }

    /// Dependents queries executed so far, with their bound id.
    pub fn executed_queries(&self) -> Vec<(String, EntityId)> {
        self.inner.executed.lock().clone()
    }

    fn read(&self, key: &EntityKey) -> Option<Entity> {
        self.inner
            .rows
            .read()
            .get(key)
            .map(|row| Entity::new(key.clone(), row.attributes.clone()))
    }

    fn dependents(&self, query: &DependentQuery) -> Result<Vec<Row>, StoreError> {
        self.inner.executed.lock().push((query.text(), query.id()));
        if self.inner.failing_queries.read().contains(query.owner_type()) {
            return Err(StoreError::Query(format!("{} unavailable", query.owner_table())));
        }

        let rows = self.inner.rows.read();
        let mut result = Vec::new();
        for (owner, row) in rows.iter() {
            if owner.entity_type != query.owner_type() {
                continue;
            }
            let Some(link) = row.links.get(query.field_name()) else {
                continue;
            };
            for target in link.targets().iter().filter(|t| t.id == query.id()) {
                let hit = match query.form() {
                    JoinForm::Scalar => Row::Entity(owner.clone()),
                    JoinForm::Collection => {
                        Row::Tuple(vec![Row::Entity(owner.clone()), Row::Entity(target.clone())])
                    }
                };
                result.push(hit);
            }
        }
        Ok(result)
    }
}

impl SessionFactory for MemoryStore {
    fn open_session(&self) -> Result<Box<dyn Session>, StoreError> {
        self.inner.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            store: self.clone(),
            open: true,
        }))
    }
}

/// Session over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySession {
    store: MemoryStore,
    open: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::Session("session is closed".into()))
        }
    }
}

impl Session for MemorySession {
    fn configure(&mut self, mode: SessionMode) {
        *self.store.inner.last_mode.lock() = Some(mode);
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        if *self.store.inner.failing_flush.read() {
            return Err(StoreError::Flush("store refused flush".into()));
        }
        self.store.inner.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get(&mut self, key: &EntityKey) -> Result<Option<Entity>, StoreError> {
        self.ensure_open()?;
        Ok(self.store.read(key))
    }

    fn load(&mut self, key: &EntityKey) -> Result<Entity, StoreError> {
        self.ensure_open()?;
        self.store
            .read(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    fn find(&mut self, query: &DependentQuery) -> Result<Vec<Row>, StoreError> {
        self.ensure_open()?;
        self.store.dependents(query)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.open = false;
        Ok(())
    }
}

/// Index sink that records what it was given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    indexed: Mutex<Vec<EntityKey>>,
    failing: Mutex<HashSet<EntityKey>>,
    delay: Option<Duration>,
}

impl RecordingSink {
    /// Create a sink that accepts everything immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before each index call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Refuse the given entity.
    pub fn fail_on(&self, key: EntityKey) {
        self.failing.lock().insert(key);
    }

    /// Entities accepted so far, in call order.
    pub fn indexed(&self) -> Vec<EntityKey> {
        self.indexed.lock().clone()
    }

    /// How many times the given entity was accepted.
    pub fn count_of(&self, key: &EntityKey) -> usize {
        self.indexed.lock().iter().filter(|k| *k == key).count()
    }

    /// Forget everything accepted so far.
    pub fn clear(&self) {
        self.indexed.lock().clear();
    }
}

impl IndexSink for RecordingSink {
    fn index(&self, entity: &Entity) -> Result<(), IndexError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.failing.lock().contains(entity.key()) {
            return Err(IndexError::Rejected {
                key: entity.key().clone(),
                reason: "refused by test sink".into(),
            });
        }
        self.indexed.lock().push(entity.key().clone());
        Ok(())
    }
}
