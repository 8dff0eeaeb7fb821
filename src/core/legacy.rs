//! Parsing of the JSON blobs stored on an estimate.
//!
//! Estimates predate several schema changes and may lack any of these fields or
//! hold something unparsable. Every parser here fails open: it logs a warning and
//! returns the empty structure instead of raising.

use crate::core::snapshot::ItemId;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::warn;

/// `works_block` of a flat-layout estimate: `{"blocks": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LegacyWorksLayout {
    pub blocks: Vec<LegacyBlock>,
}

/// One titled block of a flat layout.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LegacyBlock {
    pub title: Option<String>,
    pub items: Vec<LegacyItem>,
}

/// A work or material line inside a flat layout.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyItem {
    pub id: Option<ItemId>,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    pub work_item_id: Option<i64>,
}

/// `materials_block` was written both as `{"items": [...]}` and as a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaterialsLayout {
    Wrapped { items: Vec<LegacyItem> },
    Bare(Vec<LegacyItem>),
}

impl Default for MaterialsLayout {
    fn default() -> Self {
        Self::Bare(Vec::new())
    }
}

/// Parses `raw` as `T`, or returns `T::default()` when the field is missing,
/// blank or malformed.
pub fn parse_or_default<T>(raw: Option<&str>, field: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(text) = raw.map(str::trim).filter(|text| !text.is_empty() && *text != "null")
    else {
        return T::default();
    };

    serde_json::from_str(text).unwrap_or_else(|e| {
        warn!("Malformed serialized field {field}, treating as empty: {e}");
        T::default()
    })
}

/// Parses a JSON array of ids (`manualPrices`, `coefficientsData`).
#[must_use]
pub fn parse_id_list(raw: Option<&str>, field: &str) -> Vec<ItemId> {
    parse_or_default(raw, field)
}

/// Parses a flat works layout.
#[must_use]
pub fn parse_works_layout(raw: Option<&str>) -> LegacyWorksLayout {
    parse_or_default(raw, "worksBlock")
}

/// Parses a flat materials layout in either of its historical shapes.
#[must_use]
pub fn parse_materials_layout(raw: Option<&str>) -> Vec<LegacyItem> {
    match parse_or_default(raw, "materialsBlock") {
        MaterialsLayout::Wrapped { items } | MaterialsLayout::Bare(items) => items,
    }
}
