//! Work entity - A priced line item inside a room.
//!
//! A work either references a catalog [`super::work_item`] or is ad hoc, in which
//! case `name` and `unit` carry the manual overrides. `total_price` normally equals
//! `catalog price × quantity × coefficients` but may have been edited by hand.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Work database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "works")]
pub struct Model {
    /// Unique identifier for the work
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning room
    pub room_id: i64,
    /// Catalog reference, None for ad hoc works
    pub work_item_id: Option<i64>,
    /// Display grouping bucket
    pub block_title: Option<String>,
    /// Manual name override
    pub name: Option<String>,
    /// Manual unit override
    pub unit: Option<String>,
    /// Amount of work in `unit`
    pub quantity: f64,
    /// Stored unit price
    pub unit_price: f64,
    /// Stored total price, coefficients already applied
    pub total_price: f64,
    /// Optional free-text description
    pub description: Option<String>,
}

/// Defines relationships between Work and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each work belongs to one room
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id",
        on_delete = "Cascade"
    )]
    Room,
    /// Optional catalog reference
    #[sea_orm(
        belongs_to = "super::work_item::Entity",
        from = "Column::WorkItemId",
        to = "super::work_item::Column::Id",
        on_delete = "SetNull"
    )]
    WorkItem,
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl Related<super::work_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
