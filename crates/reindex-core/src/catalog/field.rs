//! Field declarations for entities.

use serde::{Deserialize, Serialize};

/// Scalar data types a persistent field may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit floating point.
    Float,
    /// UTF-8 string.
    String,
    /// Timestamp.
    Timestamp,
    /// Binary data.
    Bytes,
}

/// Kind of a collection-typed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Unordered set.
    Set,
    /// Ordered sequence.
    Sequence,
}

/// Element type argument of a collection field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// A concrete named type.
    Named(String),
    /// Raw collection without a type argument.
    Erased,
    /// Wildcard or bounded type parameter.
    Wildcard,
}

/// Declared type of a persistent field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// A scalar value.
    Scalar(ScalarType),
    /// A single reference to another declared type.
    Reference(String),
    /// A set or sequence of another declared type.
    Collection {
        /// Set or sequence.
        kind: CollectionKind,
        /// Declared element type.
        element: ElementType,
    },
    /// The schema source could not describe this field's type.
    Unresolved(String),
}

/// Marker declaring that a field participates in a search dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyMarker {
    /// The target's searchable attributes are copied into this entity's document.
    Embedded,
    /// Mutating the target re-indexes this entity.
    ContainedIn,
}

/// A persistent field declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name, as used in query paths.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Dependency marker, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<DependencyMarker>,
}

impl FieldDef {
    /// Create an unmarked field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            marker: None,
        }
    }

    /// Create a scalar field.
    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(name, FieldType::Scalar(scalar))
    }

    /// Create a single-valued reference field.
    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, FieldType::Reference(target.into()))
    }

    /// Create a set-of field with a concrete element type.
    pub fn set_of(name: impl Into<String>, element: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldType::Collection {
                kind: CollectionKind::Set,
                element: ElementType::Named(element.into()),
            },
        )
    }

    /// Create a sequence-of field with a concrete element type.
    pub fn sequence_of(name: impl Into<String>, element: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldType::Collection {
                kind: CollectionKind::Sequence,
                element: ElementType::Named(element.into()),
            },
        )
    }

    /// Create a collection field with an explicit element type.
    pub fn collection(name: impl Into<String>, kind: CollectionKind, element: ElementType) -> Self {
        Self::new(name, FieldType::Collection { kind, element })
    }

    /// Mark as embedded.
    pub fn embedded(mut self) -> Self {
        self.marker = Some(DependencyMarker::Embedded);
        self
    }

    /// Mark as contained-in.
    pub fn contained_in(mut self) -> Self {
        self.marker = Some(DependencyMarker::ContainedIn);
        self
    }

    /// Check if this field carries a dependency marker.
    pub fn is_dependency(&self) -> bool {
        self.marker.is_some()
    }
}
