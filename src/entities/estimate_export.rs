//! Estimate export entity - Denormalized price snapshot for client display.
//!
//! One row per estimate (unique `estimate_id`). The row is derived data and can be
//! regenerated from the live estimate graph at any time; it may legitimately not
//! exist yet. JSON payloads are stored as text.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Export cache database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "estimate_exports")]
pub struct Model {
    /// Unique identifier for the cache row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Estimate this snapshot was computed from
    #[sea_orm(unique)]
    pub estimate_id: i64,
    /// JSON array of work blocks
    pub works_data: String,
    /// JSON array of material line items
    pub materials_data: String,
    /// Sum of all work blocks
    pub total_works_price: i64,
    /// Sum of all materials
    pub total_materials_price: i64,
    /// Works + materials
    pub grand_total: i64,
    /// JSON object describing the coefficients used
    pub coefficients_info: String,
    /// When the row was first written
    pub created_at: DateTimeUtc,
    /// When the row was last replaced
    pub updated_at: DateTimeUtc,
}

/// `EstimateExport` is a weak reference keyed by `estimate_id`, not a foreign key
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
