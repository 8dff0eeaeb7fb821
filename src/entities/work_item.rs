//! Work item entity - Catalog entry with a base price.
//!
//! Works reference catalog entries to inherit a name, unit and base price.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog work item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "work_items")]
pub struct Model {
    /// Unique identifier for the catalog entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g. "Покраска стен")
    pub name: String,
    /// Unit of measure (e.g. "м²")
    pub unit: String,
    /// Base price per unit before coefficients
    pub base_price: f64,
    /// Whether the entry is offered for new works
    pub is_active: bool,
}

/// Defines relationships between `WorkItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One catalog entry is referenced by many works
    #[sea_orm(has_many = "super::work::Entity")]
    Works,
}

impl Related<super::work::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Works.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
