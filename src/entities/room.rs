//! Room entity - A section of a room-based estimate.
//!
//! Rooms are owned by exactly one estimate and own their works and materials.
//! The cached totals are maintained by the editing UI.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Room database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rooms")]
pub struct Model {
    /// Unique identifier for the room
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning estimate
    pub estimate_id: i64,
    /// Display name (e.g. "Кухня")
    pub name: String,
    /// Position of the room inside the estimate
    pub sort_order: i32,
    /// Cached sum of work prices
    pub total_works_price: f64,
    /// Cached sum of material prices
    pub total_materials_price: f64,
    /// Cached works + materials
    pub total_price: f64,
}

/// Defines relationships between Room and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each room belongs to one estimate
    #[sea_orm(
        belongs_to = "super::estimate::Entity",
        from = "Column::EstimateId",
        to = "super::estimate::Column::Id",
        on_delete = "Cascade"
    )]
    Estimate,
    /// One room has many works
    #[sea_orm(has_many = "super::work::Entity")]
    Works,
    /// One room has many materials
    #[sea_orm(has_many = "super::material::Entity")]
    Materials,
}

impl Related<super::estimate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Estimate.def()
    }
}

impl Related<super::work::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Works.def()
    }
}

impl Related<super::material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Materials.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
