//! Estimate entity - One priced document for a client.
//!
//! An estimate is either room-based (`type = "rooms"`, priced through its rooms,
//! works and materials) or a legacy flat layout (`type = "apartment"`, priced from
//! the serialized `works_block` / `materials_block` blobs). Acts are frozen copies
//! of an estimate and carry `is_act = true`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Estimate database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "estimates")]
pub struct Model {
    /// Unique identifier for the estimate
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display title
    pub title: String,
    /// Layout discriminator: `"apartment"` or `"rooms"`
    #[sea_orm(column_name = "type")]
    pub estimate_type: String,
    /// Free-form category label
    pub category: Option<String>,
    /// Owning client (managed outside this crate)
    pub client_id: i64,
    /// User that created the estimate
    pub creator_id: Option<i64>,
    /// Whether the client portal may display this estimate
    pub show_to_client: bool,
    /// Whether this row is an act (frozen copy)
    pub is_act: bool,
    /// Free-form notes
    pub notes: Option<String>,
    /// Legacy flat works layout, JSON `{"blocks": [...]}`
    pub works_block: Option<String>,
    /// Legacy flat materials layout, JSON `{"items": [...]}` or a bare array
    pub materials_block: Option<String>,
    /// Legacy works summary, copied verbatim
    pub summary_works_block: Option<String>,
    /// Legacy materials summary, copied verbatim
    pub summary_materials_block: Option<String>,
    /// JSON array of item ids whose price was edited by hand
    pub manual_prices: Option<String>,
    /// JSON array of coefficient ids applied to this estimate
    pub coefficients_data: Option<String>,
    /// When the estimate was created
    pub created_at: DateTimeUtc,
    /// When the estimate was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Estimate and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One estimate has many rooms
    #[sea_orm(has_many = "super::room::Entity")]
    Rooms,
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rooms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
