//! Dependent query planning.
//!
//! Turns a dependency edge plus the id of the mutated entity into the
//! relational query that returns the owners referencing it.

use std::fmt;

use serde::Serialize;

use crate::catalog::RegistryEntry;
use crate::graph::DependencyEdge;
use crate::key::EntityId;

/// Join shape of a dependents query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinForm {
    /// `o.{field}.id = :id`
    Scalar,
    /// `JOIN o.{field} r WHERE r.id = :id`
    Collection,
}

/// Query returning the owner instances that reference one mutated entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependentQuery {
    owner_type: String,
    owner_table: String,
    field_name: String,
    form: JoinForm,
    id: EntityId,
}

impl DependentQuery {
    /// Name of the bound parameter in [`DependentQuery::text`].
    pub const PARAM: &'static str = "id";

    /// Plan the query for `edge`, whose owner type is described by `owner`.
    pub fn plan(edge: &DependencyEdge, owner: &RegistryEntry, id: EntityId) -> Self {
        let form = if edge.is_collection {
            JoinForm::Collection
        } else {
            JoinForm::Scalar
        };
        Self {
            owner_type: owner.entity_type().to_string(),
            owner_table: owner.table().to_string(),
            field_name: edge.field_name.clone(),
            form,
            id,
        }
    }

    /// Query string with the id bound as `:id`.
    pub fn text(&self) -> String {
        match self.form {
            JoinForm::Collection => format!(
                "SELECT o FROM {} o JOIN o.{} r WHERE r.id = :{}",
                self.owner_table,
                self.field_name,
                Self::PARAM
            ),
            JoinForm::Scalar => format!(
                "SELECT o FROM {} o WHERE o.{}.id = :{}",
                self.owner_table,
                self.field_name,
                Self::PARAM
            ),
        }
    }

    /// Owner entity type.
    pub fn owner_type(&self) -> &str {
        &self.owner_type
    }

    /// Owner table name.
    pub fn owner_table(&self) -> &str {
        &self.owner_table
    }

    /// Field on the owner referencing the mutated entity.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Join shape.
    pub fn form(&self) -> JoinForm {
        self.form
    }

    /// Id bound to the query parameter.
    pub fn id(&self) -> EntityId {
        self.id
    }
}

impl fmt::Display for DependentQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}
