//! Serialized shapes of the export cache.
//!
//! Internally a line item carries one canonical display price. Older client code
//! reads the same value under several names (`adjustedUnitPrice`,
//! `displayUnitPrice`, ...), so the conversion into the wire structs below fans
//! the canonical value out to every alias. Nothing outside this module should
//! know the aliases exist.

use crate::{
    core::{
        coefficients::ResolvedCoefficients,
        grouping::{Block, LineItem, MaterialsSummary, WorksSummary},
    },
    entities::{coefficient, estimate_export},
    errors::Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a line item.
///
/// Room-based works are keyed by their numeric row id. Legacy flat layouts were
/// written by several generations of the editor and may carry string ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    /// Database row id
    Numeric(i64),
    /// Client-generated id from a legacy layout
    Text(String),
}

impl ItemId {
    /// Normalised form used for set membership, so `12` and `"12"` compare equal.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Numeric(id) => id.to_string(),
            Self::Text(id) => id.trim().to_string(),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        Self::Numeric(value)
    }
}

/// One work line as stored in `worksData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLineItem {
    /// Id of the first merged line
    pub id: Option<ItemId>,
    /// Display name
    pub name: String,
    /// Display unit
    pub unit: String,
    /// Merged quantity
    pub quantity: f64,
    /// Catalog or stored base price, before coefficients
    pub unit_price: f64,
    /// Same as `display_unit_price`
    pub adjusted_unit_price: i64,
    /// Raw total, accumulated across merged lines
    pub total_price: f64,
    /// Same as `display_total_price`
    pub adjusted_total_price: i64,
    /// Rounded unit price shown to the client
    pub display_unit_price: i64,
    /// Rounded total shown to the client
    pub display_total_price: i64,
    /// Catalog entry, if any
    pub work_item_id: Option<i64>,
    /// Whether the price was set by hand
    pub is_manual_price: bool,
}

impl From<&LineItem> for WorkLineItem {
    fn from(item: &LineItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            unit: item.unit.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            adjusted_unit_price: item.display_unit_price,
            total_price: item.total_price,
            adjusted_total_price: item.display_total_price,
            display_unit_price: item.display_unit_price,
            display_total_price: item.display_total_price,
            work_item_id: item.work_item_id,
            is_manual_price: item.is_manual_price,
        }
    }
}

/// One material line as stored in `materialsData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialLineItem {
    /// Id from the flat layout, if any
    pub id: Option<ItemId>,
    /// Material name
    pub name: String,
    /// Unit of measure
    pub unit: String,
    /// Quantity
    pub quantity: f64,
    /// Stored unit price, before coefficients
    pub unit_price: f64,
    /// Same as `display_unit_price`
    pub adjusted_unit_price: i64,
    /// Stored total
    pub total_price: f64,
    /// Same as `display_total_price`
    pub adjusted_total_price: i64,
    /// Rounded unit price shown to the client
    pub display_unit_price: i64,
    /// Rounded total shown to the client
    pub display_total_price: i64,
}

impl From<&LineItem> for MaterialLineItem {
    fn from(item: &LineItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            unit: item.unit.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            adjusted_unit_price: item.display_unit_price,
            total_price: item.total_price,
            adjusted_total_price: item.display_total_price,
            display_unit_price: item.display_unit_price,
            display_total_price: item.display_total_price,
        }
    }
}

/// One block of `worksData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkBlockData {
    /// Block title
    pub title: String,
    /// Lines in first-seen order
    pub items: Vec<WorkLineItem>,
    /// Sum of the lines' display totals
    pub total_price: i64,
}

impl From<&Block> for WorkBlockData {
    fn from(block: &Block) -> Self {
        Self {
            title: block.title.clone(),
            items: block.items.iter().map(WorkLineItem::from).collect(),
            total_price: block.total_price,
        }
    }
}

/// Coefficient record kept in the snapshot for audit display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCoefficient {
    /// Catalog id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Multiplier
    pub value: f64,
    /// `normal`, `final`, `global`, or absent
    #[serde(rename = "type")]
    pub coefficient_type: Option<String>,
}

impl From<&coefficient::Model> for AppliedCoefficient {
    fn from(model: &coefficient::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            value: model.value,
            coefficient_type: model.coefficient_type.clone(),
        }
    }
}

/// The `coefficientsInfo` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientsInfo {
    /// Product of the normal coefficients
    pub normal: f64,
    /// Product of the final coefficients
    #[serde(rename = "final")]
    pub final_coeff: f64,
    /// Global coefficient, display only
    pub global: f64,
    /// Active coefficients in the estimate's listed order
    pub applied: Vec<AppliedCoefficient>,
}

/// Everything the export cache row holds, in parsed form.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSnapshot {
    /// Work blocks in first-seen order
    pub works: Vec<WorkBlockData>,
    /// Flat material list
    pub materials: Vec<MaterialLineItem>,
    /// Sum of the block totals
    pub total_works_price: i64,
    /// Sum of the material display totals
    pub total_materials_price: i64,
    /// Works plus materials
    pub grand_total: i64,
    /// Coefficients the prices were computed with
    pub coefficients: CoefficientsInfo,
}

impl ExportSnapshot {
    /// Assembles a snapshot from aggregated works and materials.
    #[must_use]
    pub fn new(
        works: &WorksSummary,
        materials: &MaterialsSummary,
        resolved: ResolvedCoefficients,
        applied: &[coefficient::Model],
    ) -> Self {
        Self {
            works: works.blocks.iter().map(WorkBlockData::from).collect(),
            materials: materials.items.iter().map(MaterialLineItem::from).collect(),
            total_works_price: works.total_works_price,
            total_materials_price: materials.total_materials_price,
            grand_total: works.total_works_price + materials.total_materials_price,
            coefficients: CoefficientsInfo {
                normal: resolved.normal,
                final_coeff: resolved.final_coeff,
                global: resolved.global,
                applied: applied.iter().map(AppliedCoefficient::from).collect(),
            },
        }
    }

    /// Parses a persisted cache row.
    ///
    /// # Errors
    /// Returns an error if any of the JSON columns is not valid. Unlike the
    /// estimate's own blobs, the cache is written only by this crate, so a parse
    /// failure is a real fault.
    pub fn from_row(row: &estimate_export::Model) -> Result<Self> {
        Ok(Self {
            works: serde_json::from_str(&row.works_data)?,
            materials: serde_json::from_str(&row.materials_data)?,
            total_works_price: row.total_works_price,
            total_materials_price: row.total_materials_price,
            grand_total: row.grand_total,
            coefficients: serde_json::from_str(&row.coefficients_info)?,
        })
    }

    /// JSON text for the `worksData` column.
    pub fn works_json(&self) -> Result<String> {
        serde_json::to_string(&self.works).map_err(Into::into)
    }

    /// JSON text for the `materialsData` column.
    pub fn materials_json(&self) -> Result<String> {
        serde_json::to_string(&self.materials).map_err(Into::into)
    }

    /// JSON text for the `coefficientsInfo` column.
    pub fn coefficients_json(&self) -> Result<String> {
        serde_json::to_string(&self.coefficients).map_err(Into::into)
    }

    /// The whole snapshot as one JSON document, as served to the client portal.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "worksData": self.works,
            "materialsData": self.materials,
            "totalWorksPrice": self.total_works_price,
            "totalMaterialsPrice": self.total_materials_price,
            "grandTotal": self.grand_total,
            "coefficientsInfo": self.coefficients,
        })
    }
}
