//! End-to-end walks over the in-memory store.

use std::sync::Arc;

use reindex_core::{
    CacheMode, DependencyEdge, EntityDef, EntityId, EntityKey, FailureKind, FieldDef, FlushMode,
    MemoryStore, RecordingSink, Registry, ReindexConfig, ReindexEngine, StoredEntity, WalkState,
};
use serde_json::json;

struct TestContext {
    store: MemoryStore,
    sink: Arc<RecordingSink>,
    engine: ReindexEngine,
}

impl TestContext {
    fn new(registry: Registry) -> Self {
        Self::with_sink(registry, RecordingSink::new())
    }

    fn with_sink(registry: Registry, sink: RecordingSink) -> Self {
        let store = MemoryStore::new();
        let sink = Arc::new(sink);
        let engine = ReindexEngine::new(
            registry,
            Arc::new(store.clone()),
            sink.clone(),
            ReindexConfig::default(),
        );
        Self {
            store,
            sink,
            engine,
        }
    }

    fn insert(&self, key: EntityKey, row: StoredEntity) {
        self.store.insert(key, row);
    }
}

fn key(entity_type: &str, id: i64) -> EntityKey {
    EntityKey::new(entity_type, id)
}

fn shop_registry() -> Registry {
    Registry::builder()
        .with_entity(EntityDef::new("Address"))
        .with_entity(
            EntityDef::new("Customer")
                .with_field(FieldDef::reference("address", "Address").embedded()),
        )
        .with_entity(
            EntityDef::new("Order")
                .with_field(FieldDef::reference("customer", "Customer").embedded()),
        )
        .build()
}

#[test]
fn scalar_edge_indexes_every_matching_owner() {
    let ctx = TestContext::new(shop_registry());
    ctx.insert(key("Customer", 7), StoredEntity::new(json!({"name": "ACME"})));
    ctx.insert(key("Customer", 8), StoredEntity::default());
    for (id, customer) in [(1, 7), (2, 7), (3, 8)] {
        ctx.insert(
            key("Order", id),
            StoredEntity::default().with_link("customer", key("Customer", customer)),
        );
    }

    let report = ctx.engine.walk(&key("Customer", 7));

    assert_eq!(
        ctx.store.executed_queries(),
        vec![(
            "SELECT o FROM Order o WHERE o.customer.id = :id".to_string(),
            EntityId(7)
        )]
    );
    assert_eq!(
        ctx.sink.indexed(),
        vec![key("Customer", 7), key("Order", 1), key("Order", 2)]
    );
    assert_eq!(report.state, WalkState::Completed);
    assert!(report.failures.is_empty());
}

#[test]
fn collection_edge_uses_join_query() {
    let registry = Registry::builder()
        .with_entity(EntityDef::new("User"))
        .with_entity(
            EntityDef::new("Project")
                .with_field(FieldDef::set_of("members", "User").contained_in()),
        )
        .build();
    let ctx = TestContext::new(registry);
    ctx.insert(key("User", 42), StoredEntity::default());
    ctx.insert(
        key("Project", 1),
        StoredEntity::default().with_links("members", [key("User", 41), key("User", 42)]),
    );
    ctx.insert(
        key("Project", 2),
        StoredEntity::default().with_links("members", [key("User", 41)]),
    );

    ctx.engine.walk(&key("User", 42));

    assert_eq!(
        ctx.store.executed_queries(),
        vec![(
            "SELECT o FROM Project o JOIN o.members r WHERE r.id = :id".to_string(),
            EntityId(42)
        )]
    );
    assert_eq!(ctx.sink.indexed(), vec![key("User", 42), key("Project", 1)]);
}

#[test]
fn transitive_walk_indexes_each_entity_once() {
    let ctx = TestContext::new(shop_registry());
    ctx.insert(key("Address", 1), StoredEntity::default());
    for customer in [10, 11] {
        ctx.insert(
            key("Customer", customer),
            StoredEntity::default().with_link("address", key("Address", 1)),
        );
    }
    for (order, customer) in [(100, 10), (101, 10), (102, 11)] {
        ctx.insert(
            key("Order", order),
            StoredEntity::default().with_link("customer", key("Customer", customer)),
        );
    }

    let report = ctx.engine.walk(&key("Address", 1));

    assert_eq!(
        ctx.sink.indexed(),
        vec![
            key("Address", 1),
            key("Customer", 10),
            key("Order", 100),
            key("Order", 101),
            key("Customer", 11),
            key("Order", 102),
        ]
    );
    assert_eq!(report.size(), 6);
    for entity in ctx.sink.indexed() {
        assert_eq!(ctx.sink.count_of(&entity), 1);
    }
}

#[test]
fn cycle_indexes_each_side_once() {
    let registry = Registry::builder()
        .with_entity(EntityDef::new("A").with_field(FieldDef::reference("b", "B").embedded()))
        .with_entity(EntityDef::new("B").with_field(FieldDef::reference("a", "A").embedded()))
        .build();
    let ctx = TestContext::new(registry);
    ctx.insert(key("A", 1), StoredEntity::default().with_link("b", key("B", 2)));
    ctx.insert(key("B", 2), StoredEntity::default().with_link("a", key("A", 1)));

    let report = ctx.engine.walk(&key("A", 1));

    assert_eq!(ctx.sink.indexed(), vec![key("A", 1), key("B", 2)]);
    assert_eq!(report.size(), 2);
}

#[test]
fn diamond_is_indexed_once() {
    // D embeds both B and C, which both embed A.
    let registry = Registry::builder()
        .with_entity(EntityDef::new("A"))
        .with_entity(EntityDef::new("B").with_field(FieldDef::reference("a", "A").embedded()))
        .with_entity(EntityDef::new("C").with_field(FieldDef::reference("a", "A").embedded()))
        .with_entity(
            EntityDef::new("D")
                .with_field(FieldDef::reference("b", "B").embedded())
                .with_field(FieldDef::reference("c", "C").embedded()),
        )
        .build();
    let ctx = TestContext::new(registry);
    ctx.insert(key("A", 1), StoredEntity::default());
    ctx.insert(key("B", 1), StoredEntity::default().with_link("a", key("A", 1)));
    ctx.insert(key("C", 1), StoredEntity::default().with_link("a", key("A", 1)));
    ctx.insert(
        key("D", 1),
        StoredEntity::default()
            .with_link("b", key("B", 1))
            .with_link("c", key("C", 1)),
    );

    ctx.engine.walk(&key("A", 1));

    assert_eq!(
        ctx.sink.indexed(),
        vec![key("A", 1), key("B", 1), key("D", 1), key("C", 1)]
    );
}

#[test]
fn missing_root_logs_and_indexes_nothing() {
    let registry = Registry::builder()
        .with_entity(EntityDef::new("A").with_field(FieldDef::reference("b", "B").embedded()))
        .with_entity(EntityDef::new("B").with_field(FieldDef::reference("a", "A").embedded()))
        .build();
    let ctx = TestContext::new(registry);

    let report = ctx.engine.walk(&key("A", 999));

    assert!(ctx.sink.indexed().is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::EntityNotFound);
    assert_eq!(report.failures[0].key, key("A", 999));
    assert_eq!(report.state, WalkState::Completed);
}

#[test]
fn bulk_walk_reports_size() {
    let ctx = TestContext::new(shop_registry());
    ctx.insert(key("Customer", 1), StoredEntity::default());
    for order in 1..=11 {
        ctx.insert(
            key("Order", order),
            StoredEntity::default().with_link("customer", key("Customer", 1)),
        );
    }

    let report = ctx.engine.walk(&key("Customer", 1));

    assert_eq!(report.size(), 12);
    let snapshot = ctx.engine.metrics().snapshot();
    assert_eq!(snapshot.walks_completed, 1);
    assert_eq!(snapshot.entities_indexed, 12);
    assert_eq!(snapshot.indexed_by_type.get("Order"), Some(&11));
}

#[test]
fn repeated_walks_index_the_same_keys() {
    let ctx = TestContext::new(shop_registry());
    ctx.insert(key("Address", 1), StoredEntity::default());
    ctx.insert(
        key("Customer", 2),
        StoredEntity::default().with_link("address", key("Address", 1)),
    );
    ctx.insert(
        key("Order", 3),
        StoredEntity::default().with_link("customer", key("Customer", 2)),
    );

    let first = ctx.engine.walk(&key("Address", 1));
    let second = ctx.engine.walk(&key("Address", 1));

    assert_eq!(first.indexed, second.indexed);
    assert_eq!(ctx.sink.count_of(&key("Order", 3)), 2);
    assert_eq!(ctx.store.sessions_opened(), 2);
}

#[test]
fn index_failure_does_not_stop_the_walk() {
    let sink = RecordingSink::new();
    sink.fail_on(key("Customer", 10));
    let ctx = TestContext::with_sink(shop_registry(), sink);
    ctx.insert(key("Address", 1), StoredEntity::default());
    for customer in [10, 11] {
        ctx.insert(
            key("Customer", customer),
            StoredEntity::default().with_link("address", key("Address", 1)),
        );
    }
    ctx.insert(
        key("Order", 100),
        StoredEntity::default().with_link("customer", key("Customer", 10)),
    );

    let report = ctx.engine.walk(&key("Address", 1));

    assert_eq!(
        ctx.sink.indexed(),
        vec![key("Address", 1), key("Order", 100), key("Customer", 11)]
    );
    let failures: Vec<_> = report.failures_of(FailureKind::IndexFailure).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].key, key("Customer", 10));
}

#[test]
fn walk_session_is_isolated_and_configured() {
    let ctx = TestContext::new(shop_registry());
    ctx.insert(key("Address", 1), StoredEntity::default());
    ctx.insert(
        key("Customer", 2),
        StoredEntity::default().with_link("address", key("Address", 1)),
    );

    ctx.engine.walk(&key("Address", 1));

    assert_eq!(ctx.store.sessions_opened(), 1);
    // One flush per entity entered.
    assert_eq!(ctx.store.flushes(), 2);
    let mode = ctx.store.last_session_mode().unwrap();
    assert_eq!(mode.flush, FlushMode::Auto);
    assert_eq!(mode.cache, CacheMode::Ignore);
}

#[test]
fn engine_graph_matches_registry() {
    let ctx = TestContext::new(shop_registry());
    let graph = ctx.engine.graph();
    assert_eq!(
        graph.get("Customer"),
        &[DependencyEdge::new("Order", "customer", false)]
    );
    assert_eq!(graph.edge_count(), 2);
}
