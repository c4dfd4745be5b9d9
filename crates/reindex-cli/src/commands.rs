//! Subcommand handlers.

use std::sync::Arc;

use reindex_core::{
    DependencyGraph, DependentQuery, EntityKey, GraphBuilder, MemoryStore, Registry,
    ReindexConfig, ReindexEngine,
};

use crate::args::{Args, Command};
use crate::error::CliError;
use crate::formatter::{create_formatter, Formatter};
use crate::sink::LoggingSink;

/// Execute the parsed command and return its formatted output.
pub async fn run(args: Args) -> Result<String, CliError> {
    let formatter = create_formatter(args.format);
    let registry = Registry::from_path(&args.schema)?;
    tracing::debug!(
        schema = %args.schema.display(),
        entities = registry.len(),
        "schema loaded"
    );

    let command = args.command.clone();
    let config = args.into_config();

    match command {
        Command::Graph => Ok(graph(&registry, &*formatter)),
        Command::Plan { entity_type, id } => {
            plan(&registry, &EntityKey::new(entity_type, id), &*formatter)
        }
        Command::Walk {
            entity_type,
            id,
            data,
        } => {
            let store = MemoryStore::from_path(&data)?;
            tracing::debug!(data = %data.display(), rows = store.len(), "fixture loaded");
            walk(
                registry,
                store,
                config,
                EntityKey::new(entity_type, id),
                &*formatter,
            )
            .await
        }
    }
}

fn graph(registry: &Registry, formatter: &dyn Formatter) -> String {
    let mut builder = GraphBuilder::new(registry);
    builder.register_all();
    let (graph, skipped) = builder.build_with_report();
    formatter.format_graph(&graph, &skipped)
}

fn plan(
    registry: &Registry,
    root: &EntityKey,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    if !registry.contains(&root.entity_type) {
        return Err(CliError::UnknownType(root.entity_type.clone()));
    }

    let graph = DependencyGraph::from_registry(registry);
    let queries: Vec<DependentQuery> = graph
        .get(&root.entity_type)
        .iter()
        .filter_map(|edge| {
            registry
                .lookup_by_type(&edge.owner_type)
                .map(|owner| DependentQuery::plan(edge, owner, root.id))
        })
        .collect();

    Ok(formatter.format_plan(root, &queries))
}

async fn walk(
    registry: Registry,
    store: MemoryStore,
    config: ReindexConfig,
    root: EntityKey,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    if !registry.contains(&root.entity_type) {
        return Err(CliError::UnknownType(root.entity_type));
    }

    let sink = Arc::new(LoggingSink::new());
    let engine = Arc::new(ReindexEngine::new(
        registry,
        Arc::new(store),
        sink.clone(),
        config,
    ));

    let worker = engine.clone();
    let report = tokio::task::spawn_blocking(move || worker.walk(&root)).await?;
    tracing::debug!(documents = sink.documents(), "dry run finished");

    Ok(formatter.format_walk(&report, &engine.metrics().snapshot()))
}
