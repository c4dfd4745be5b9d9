//! Entity catalog.
//!
//! Declares the managed entity types, their persistent fields and the
//! dependency markers on those fields, and exposes the registry the graph
//! builder and the traversal read from.

mod entity;
mod field;
mod registry;

pub use entity::EntityDef;
pub use field::{CollectionKind, DependencyMarker, ElementType, FieldDef, FieldType, ScalarType};
pub use registry::{EntityDeclaration, Registry, RegistryBuilder, RegistryEntry, SchemaDeclaration};
