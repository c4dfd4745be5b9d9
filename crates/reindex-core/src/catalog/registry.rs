//! Registry of managed entity types.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::entity::EntityDef;
use super::field::FieldDef;
use crate::error::Error;

/// Associates a managed entity type with the table name used in query strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    entity: EntityDef,
    table: String,
}

impl RegistryEntry {
    /// Create an entry whose table name equals the entity type name.
    pub fn new(entity: EntityDef) -> Self {
        let table = entity.name.clone();
        Self { entity, table }
    }

    /// Override the table name used in query strings.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Managed entity type name.
    pub fn entity_type(&self) -> &str {
        &self.entity.name
    }

    /// Table (or persistent class) name used in query strings.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The entity definition.
    pub fn entity(&self) -> &EntityDef {
        &self.entity
    }
}

/// Builder that collects registry entries in registration order.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<RegistryEntry>,
    by_type: HashMap<String, usize>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry.
    ///
    /// Returns `false` (and keeps the first registration) if the type is
    /// already registered.
    pub fn register(&mut self, entry: RegistryEntry) -> bool {
        if self.by_type.contains_key(entry.entity_type()) {
            tracing::warn!(
                entity = entry.entity_type(),
                "entity type already registered, ignoring"
            );
            return false;
        }
        self.by_type
            .insert(entry.entity_type().to_string(), self.entries.len());
        self.entries.push(entry);
        true
    }

    /// Register an entry, builder style.
    pub fn with_entry(mut self, entry: RegistryEntry) -> Self {
        self.register(entry);
        self
    }

    /// Register an entity whose table name equals its type name.
    pub fn with_entity(self, entity: EntityDef) -> Self {
        self.with_entry(RegistryEntry::new(entity))
    }

    /// Freeze the registry.
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
            by_type: self.by_type,
        }
    }
}

/// Immutable, ordered set of managed entity types.
///
/// Populated once at startup; the graph builder and the traversal never see
/// later changes.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
    by_type: HashMap<String, usize>,
}

impl Registry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// All entries in registration order.
    pub fn ordered_entities(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Look up the entry for a managed entity type.
    pub fn lookup_by_type(&self, entity_type: &str) -> Option<&RegistryEntry> {
        self.by_type.get(entity_type).map(|&i| &self.entries[i])
    }

    /// Check if a type is managed.
    pub fn contains(&self, entity_type: &str) -> bool {
        self.by_type.contains_key(entity_type)
    }

    /// Number of managed types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no type is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a registry from a JSON schema declaration.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let declaration: SchemaDeclaration = serde_json::from_str(json)?;
        declaration.into_registry()
    }

    /// Build a registry from a JSON schema declaration file.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Declarative schema, one entry per concrete persistent type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDeclaration {
    /// Entity declarations in registration order.
    pub entities: Vec<EntityDeclaration>,
}

/// Declaration of one managed entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDeclaration {
    /// Entity type name.
    pub name: String,
    /// Table name, defaults to the type name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Declared persistent fields.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl SchemaDeclaration {
    /// Convert into a registry, rejecting empty or repeated type names.
    pub fn into_registry(self) -> Result<Registry, Error> {
        let mut builder = Registry::builder();
        for decl in self.entities {
            if decl.name.trim().is_empty() {
                return Err(Error::Schema("entity declared without a name".into()));
            }
            let name = decl.name.clone();
            let mut entry = RegistryEntry::new(EntityDef::new(decl.name).with_fields(decl.fields));
            if let Some(table) = decl.table {
                entry = entry.with_table(table);
            }
            if !builder.register(entry) {
                return Err(Error::Schema(format!("entity {} declared twice", name)));
            }
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, ScalarType};

    fn sample_registry() -> Registry {
        Registry::builder()
            .with_entity(
                EntityDef::new("Customer").with_field(FieldDef::scalar("name", ScalarType::String)),
            )
            .with_entry(
                RegistryEntry::new(
                    EntityDef::new("Order")
                        .with_field(FieldDef::reference("customer", "Customer").embedded()),
                )
                .with_table("OrderDO"),
            )
            .build()
    }

    #[test]
    fn test_ordered_entities() {
        let registry = sample_registry();
        let names: Vec<_> = registry
            .ordered_entities()
            .iter()
            .map(|e| e.entity_type())
            .collect();
        assert_eq!(names, vec!["Customer", "Order"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_lookup_by_type() {
        let registry = sample_registry();
        let order = registry.lookup_by_type("Order").unwrap();
        assert_eq!(order.table(), "OrderDO");
        assert_eq!(registry.lookup_by_type("Customer").unwrap().table(), "Customer");
        assert!(registry.lookup_by_type("Invoice").is_none());
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut builder = RegistryBuilder::new();
        assert!(builder.register(RegistryEntry::new(EntityDef::new("User")).with_table("T1")));
        assert!(!builder.register(RegistryEntry::new(EntityDef::new("User")).with_table("T2")));

        let registry = builder.build();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup_by_type("User").unwrap().table(), "T1");
    }

    #[test]
    fn test_from_json() {
        let registry = Registry::from_json(
            r#"{
                "entities": [
                    {"name": "User", "fields": [{"name": "login", "type": {"scalar": "string"}}]},
                    {"name": "Project", "table": "ProjectDO", "fields": [
                        {"name": "members", "type": {"collection": {"kind": "set", "element": {"named": "User"}}}, "marker": "contained_in"}
                    ]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        let project = registry.lookup_by_type("Project").unwrap();
        assert_eq!(project.table(), "ProjectDO");
        assert!(project.entity().get_field("members").unwrap().is_dependency());
    }

    #[test]
    fn test_from_json_rejects_duplicates() {
        let result = Registry::from_json(r#"{"entities": [{"name": "A"}, {"name": "A"}]}"#);
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(matches!(Registry::from_json("{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, r#"{"entities": [{"name": "User"}]}"#).unwrap();

        let registry = Registry::from_path(&path).unwrap();
        assert!(registry.contains("User"));

        let missing = Registry::from_path(&dir.path().join("absent.json"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
