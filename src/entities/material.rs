//! Material entity - A material line item inside a room.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Material database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "materials")]
pub struct Model {
    /// Unique identifier for the material
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning room
    pub room_id: i64,
    /// Display name
    pub name: String,
    /// Unit of measure
    pub unit: String,
    /// Amount in `unit`
    pub quantity: f64,
    /// Stored unit price
    pub unit_price: f64,
    /// Stored total price
    pub total_price: f64,
}

/// Defines relationships between Material and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each material belongs to one room
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id",
        on_delete = "Cascade"
    )]
    Room,
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
