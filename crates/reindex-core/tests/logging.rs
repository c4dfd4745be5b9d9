//! Log lines operators rely on.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use reindex_core::{
    CollectionKind, ElementType, EntityDef, EntityKey, FieldDef, GraphBuilder, MemoryStore,
    RecordingSink, Registry, ReindexConfig, ReindexEngine, StoredEntity,
};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    fn lines_containing(&self, needle: &str) -> Vec<String> {
        self.text()
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture<T>(f: impl FnOnce() -> T) -> (T, Captured) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, captured)
}

fn key(entity_type: &str, id: i64) -> EntityKey {
    EntityKey::new(entity_type, id)
}

fn registry() -> Registry {
    Registry::builder()
        .with_entity(EntityDef::new("Customer"))
        .with_entity(
            EntityDef::new("Order")
                .with_field(FieldDef::reference("customer", "Customer").embedded()),
        )
        .build()
}

fn engine_with_orders(orders: i64) -> ReindexEngine {
    let store = MemoryStore::new();
    store.insert(key("Customer", 1), StoredEntity::default());
    for id in 1..=orders {
        store.insert(
            key("Order", id),
            StoredEntity::default().with_link("customer", key("Customer", 1)),
        );
    }
    ReindexEngine::new(
        registry(),
        Arc::new(store),
        Arc::new(RecordingSink::new()),
        ReindexConfig::default(),
    )
}

#[test]
fn duplicate_edge_is_warned_and_ignored() {
    let registry = registry();
    let order = registry.lookup_by_type("Order").unwrap();

    let (graph, logs) = capture(|| {
        let mut builder = GraphBuilder::new(&registry);
        assert_eq!(builder.register(order), 1);
        assert_eq!(builder.register(order), 0);
        builder.build()
    });

    assert_eq!(graph.get("Customer").len(), 1);
    let warnings = logs.lines_containing("dependency edge already registered");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("WARN"));
    assert!(warnings[0].contains("owner=Order"));
}

#[test]
fn bulk_walk_logs_one_summary() {
    let engine = engine_with_orders(11);

    let (report, logs) = capture(|| engine.walk(&key("Customer", 1)));

    assert_eq!(report.size(), 12);
    let summaries = logs.lines_containing("re-indexing of dependent objects done");
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].contains("root=Customer:1"));
    assert!(summaries[0].contains("size=12"));
}

#[test]
fn small_walk_logs_no_summary() {
    let engine = engine_with_orders(3);

    let (report, logs) = capture(|| engine.walk(&key("Customer", 1)));

    assert_eq!(report.size(), 4);
    assert!(logs
        .lines_containing("re-indexing of dependent objects done")
        .is_empty());
}

#[test]
fn missing_entity_is_logged_at_info() {
    let engine = engine_with_orders(0);

    let (report, logs) = capture(|| engine.walk(&key("Customer", 404)));

    assert_eq!(report.size(), 0);
    let lines = logs.lines_containing("failed to re-index");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("INFO"));
    assert!(lines[0].contains("Customer:404"));
    assert!(lines[0].contains("kind=entity_not_found"));
}

#[test]
fn unresolved_collection_is_warned() {
    let registry = Registry::builder()
        .with_entity(EntityDef::new("Tag"))
        .with_entity(
            EntityDef::new("Post").with_field(
                FieldDef::collection("tags", CollectionKind::Set, ElementType::Erased)
                    .contained_in(),
            ),
        )
        .build();

    let ((graph, skipped), logs) = capture(|| {
        let mut builder = GraphBuilder::new(&registry);
        builder.register_all();
        builder.build_with_report()
    });

    assert!(graph.is_empty());
    assert_eq!(skipped.len(), 1);
    let lines = logs.lines_containing("skipping dependency field");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("field=tags"));
}
