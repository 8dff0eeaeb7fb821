//! Coefficient entity - A named price multiplier from the global catalog.
//!
//! Estimates reference a subset of coefficients by id. The `type` column tells the
//! resolver how to fold the value: absent or `"normal"`, `"final"`, or `"global"`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Coefficient database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coefficients")]
pub struct Model {
    /// Unique identifier for the coefficient
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Multiplier value
    pub value: f64,
    /// Role discriminator, None means `"normal"`
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub coefficient_type: Option<String>,
    /// Inactive coefficients are ignored even when an estimate lists them
    pub is_active: bool,
}

/// `Coefficient` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
