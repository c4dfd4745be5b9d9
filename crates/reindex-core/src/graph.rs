//! Reverse dependency graph.
//!
//! For every registered entity type the builder walks the declared fields and,
//! for each field marked embedded or contained-in whose target is a managed
//! entity (directly or as the element of a set/sequence), records an edge
//! under the *embedded* type pointing back at the owner. At traversal time the
//! mutated entity's type is the lookup key: "what changed" maps straight to
//! "who depends on it".

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::catalog::{ElementType, FieldDef, FieldType, Registry, RegistryEntry};

/// Reverse dependency: the owner type holds a field referencing the embedded type.
///
/// Two edges are equal when owner type and field name match; the collection
/// flag is metadata.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyEdge {
    /// Type declaring the marked field.
    pub owner_type: String,
    /// Name of the marked field on the owner.
    pub field_name: String,
    /// Whether the field is a set or sequence of the embedded type.
    pub is_collection: bool,
}

impl DependencyEdge {
    /// Create an edge.
    pub fn new(
        owner_type: impl Into<String>,
        field_name: impl Into<String>,
        is_collection: bool,
    ) -> Self {
        Self {
            owner_type: owner_type.into(),
            field_name: field_name.into(),
            is_collection,
        }
    }
}

impl PartialEq for DependencyEdge {
    fn eq(&self, other: &Self) -> bool {
        self.owner_type == other.owner_type && self.field_name == other.field_name
    }
}

impl Eq for DependencyEdge {}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Edge[owner={},field={},collection={}]",
            self.owner_type, self.field_name, self.is_collection
        )
    }
}

/// Why a marked field produced no edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Collection element type is erased or a wildcard.
    UnresolvedElementType,
    /// The field's declared type could not be described.
    DeclarationFailure(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnresolvedElementType => write!(f, "unresolved collection element type"),
            SkipReason::DeclarationFailure(reason) => write!(f, "declaration failure: {}", reason),
        }
    }
}

/// A marked field the builder refused to turn into an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedField {
    /// Type declaring the field.
    pub owner_type: String,
    /// Field name.
    pub field_name: String,
    /// Reason the field was skipped.
    pub reason: SkipReason,
}

/// Outcome of resolving a marked field's target.
enum Target<'f> {
    /// Managed entity target and collection flag.
    Entity(&'f str, bool),
    /// Not a managed entity; skipped silently.
    Ignored,
    /// Skipped with a report entry.
    Skipped(SkipReason),
}

/// Builds the [`DependencyGraph`] from registry entries.
pub struct GraphBuilder<'r> {
    registry: &'r Registry,
    edges: HashMap<String, Vec<DependencyEdge>>,
    order: Vec<String>,
    skipped: Vec<SkippedField>,
}

impl<'r> GraphBuilder<'r> {
    /// Create a builder that resolves targets against the given registry.
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            edges: HashMap::new(),
            order: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Register every entry of the registry, in registry order.
    pub fn register_all(&mut self) -> usize {
        let registry = self.registry;
        registry
            .ordered_entities()
            .iter()
            .map(|entry| self.register(entry))
            .sum()
    }

    /// Scan one entry's declared fields and insert its edges.
    ///
    /// Returns the number of edges inserted. Edges already present under the
    /// same embedded type are refused with a warning.
    pub fn register(&mut self, entry: &RegistryEntry) -> usize {
        let owner_type = entry.entity_type();
        if !self.registry.contains(owner_type) {
            tracing::warn!(entity = owner_type, "entity type is not managed, skipping");
            return 0;
        }

        let mut inserted = 0;
        for field in entry.entity().dependency_fields() {
            match self.resolve_target(field) {
                Target::Entity(embedded_type, is_collection) => {
                    let edge = DependencyEdge::new(owner_type, field.name.as_str(), is_collection);
                    if self.insert(embedded_type, edge) {
                        inserted += 1;
                    }
                }
                Target::Ignored => {}
                Target::Skipped(reason) => {
                    tracing::warn!(
                        entity = owner_type,
                        field = %field.name,
                        reason = %reason,
                        "skipping dependency field"
                    );
                    self.skipped.push(SkippedField {
                        owner_type: owner_type.to_string(),
                        field_name: field.name.clone(),
                        reason,
                    });
                }
            }
        }
        inserted
    }

    fn resolve_target<'f>(&self, field: &'f FieldDef) -> Target<'f> {
        let (target, is_collection) = match &field.field_type {
            FieldType::Reference(target) => (target.as_str(), false),
            FieldType::Collection { element, .. } => match element {
                ElementType::Named(target) => (target.as_str(), true),
                ElementType::Erased | ElementType::Wildcard => {
                    return Target::Skipped(SkipReason::UnresolvedElementType);
                }
            },
            FieldType::Unresolved(reason) => {
                return Target::Skipped(SkipReason::DeclarationFailure(reason.clone()));
            }
            FieldType::Scalar(_) => return Target::Ignored,
        };

        if self.registry.contains(target) {
            Target::Entity(target, is_collection)
        } else {
            Target::Ignored
        }
    }

    fn insert(&mut self, embedded_type: &str, edge: DependencyEdge) -> bool {
        if !self.edges.contains_key(embedded_type) {
            self.order.push(embedded_type.to_string());
        }
        let list = self.edges.entry(embedded_type.to_string()).or_default();

        if list.contains(&edge) {
            tracing::warn!(
                embedded = embedded_type,
                edge = %edge,
                "dependency edge already registered"
            );
            return false;
        }

        tracing::debug!(embedded = embedded_type, edge = %edge, "dependency edge registered");
        list.push(edge);
        true
    }

    /// Fields skipped so far.
    pub fn skipped(&self) -> &[SkippedField] {
        &self.skipped
    }

    /// Freeze the graph.
    pub fn build(self) -> DependencyGraph {
        self.build_with_report().0
    }

    /// Freeze the graph and return the skipped fields alongside it.
    pub fn build_with_report(self) -> (DependencyGraph, Vec<SkippedField>) {
        let graph = DependencyGraph {
            edges: self.edges,
            order: self.order,
        };
        (graph, self.skipped)
    }
}

/// Immutable mapping from embedded type to the edges of its dependents.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: HashMap<String, Vec<DependencyEdge>>,
    order: Vec<String>,
}

impl DependencyGraph {
    /// Build the graph for every entry of the registry.
    pub fn from_registry(registry: &Registry) -> Self {
        let mut builder = GraphBuilder::new(registry);
        let edges = builder.register_all();
        let graph = builder.build();
        tracing::debug!(
            entities = registry.len(),
            embedded_types = graph.order.len(),
            edges,
            "dependency graph built"
        );
        graph
    }

    /// Edges of the dependents of `embedded_type`, in insertion order.
    pub fn get(&self, embedded_type: &str) -> &[DependencyEdge] {
        self.edges
            .get(embedded_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Embedded types with at least one edge, in insertion order.
    pub fn embedded_types(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Iterate `(embedded_type, edges)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DependencyEdge])> {
        self.order.iter().map(|t| (t.as_str(), self.get(t)))
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Check if the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
