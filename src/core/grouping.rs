//! Block aggregation.
//!
//! Works are bucketed into named blocks by their block title. Blocks keep the
//! order in which their title was first seen. Inside a block, lines with the same
//! name, unit, catalog reference and manual flag are merged: quantities and
//! totals add up and the display unit price becomes `round(total / quantity)`,
//! i.e. a price-weighted average of the merged lines.

use crate::{
    core::{
        coefficients::ResolvedCoefficients,
        estimate::RoomGraph,
        legacy::{LegacyItem, LegacyWorksLayout},
        manual::{ManualPriceSet, is_manual_price},
        pricing::{PriceInput, PricingPolicy, project_item, unit_price_for},
        snapshot::ItemId,
    },
    errors::{Error, Result},
};
use std::collections::HashMap;
use tracing::debug;

/// Block title used when a work has none.
pub const DEFAULT_BLOCK_TITLE: &str = "Прочее";
/// Name shown for a work with neither a catalog reference nor a manual name.
pub const UNTITLED_NAME: &str = "Без названия";
/// Unit shown for a work with neither a catalog reference nor a manual unit.
pub const DEFAULT_UNIT: &str = "шт";

/// A priced line item with one canonical display price.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    /// Id of the first line merged into this one
    pub id: Option<ItemId>,
    /// Display name, part of the merge key
    pub name: String,
    /// Display unit, part of the merge key
    pub unit: String,
    /// Summed quantity of all merged lines
    pub quantity: f64,
    /// Base price before coefficients
    pub unit_price: f64,
    /// Stored total, then grows by each merged line's display total
    pub total_price: f64,
    /// `round(display_total_price / quantity)`
    pub display_unit_price: i64,
    /// Rounded price shown to the client
    pub display_total_price: i64,
    /// Catalog entry, part of the merge key
    pub work_item_id: Option<i64>,
    /// Manual lines never merge with auto-priced ones
    pub is_manual_price: bool,
}

impl LineItem {
    fn merges_with(&self, other: &Self) -> bool {
        self.name == other.name
            && self.unit == other.unit
            && self.work_item_id == other.work_item_id
            && self.is_manual_price == other.is_manual_price
    }

    #[allow(clippy::cast_precision_loss)]
    fn absorb(&mut self, other: &Self) {
        self.quantity += other.quantity;
        self.total_price += other.display_total_price as f64;
        self.display_total_price += other.display_total_price;
        self.display_unit_price =
            unit_price_for(self.display_total_price as f64, self.quantity);
    }
}

/// A titled group of work lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Block title, unique within a summary
    pub title: String,
    /// Merged lines in first-seen order
    pub items: Vec<LineItem>,
    /// Sum of the items' display totals
    pub total_price: i64,
}

/// Aggregated works of one estimate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorksSummary {
    /// Blocks in first-seen order
    pub blocks: Vec<Block>,
    /// Sum of the block totals
    pub total_works_price: i64,
}

/// Aggregated materials of one estimate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialsSummary {
    /// Priced materials in input order
    pub items: Vec<LineItem>,
    /// Sum of the items' display totals
    pub total_materials_price: i64,
}

/// Accumulates line items into blocks, merging duplicates.
#[derive(Debug, Default)]
pub struct BlockAggregator {
    blocks: Vec<Block>,
    index: HashMap<String, usize>,
}

impl BlockAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a line to the block named `title`, or to [`DEFAULT_BLOCK_TITLE`]
    /// when the title is missing or blank.
    pub fn add(&mut self, title: Option<&str>, item: LineItem) {
        let title = title
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(DEFAULT_BLOCK_TITLE);

        let position = match self.index.get(title) {
            Some(&position) => position,
            None => {
                self.blocks.push(Block {
                    title: title.to_string(),
                    items: Vec::new(),
                    total_price: 0,
                });
                self.index.insert(title.to_string(), self.blocks.len() - 1);
                self.blocks.len() - 1
            }
        };

        let block = &mut self.blocks[position];
        match block.items.iter_mut().find(|existing| existing.merges_with(&item)) {
            Some(existing) => existing.absorb(&item),
            None => block.items.push(item),
        }
    }

    /// Finishes aggregation, computing block and grand totals from the final
    /// item state.
    #[must_use]
    pub fn finish(mut self) -> WorksSummary {
        for block in &mut self.blocks {
            block.total_price = block.items.iter().map(|item| item.display_total_price).sum();
        }
        let total_works_price = self.blocks.iter().map(|block| block.total_price).sum();

        WorksSummary {
            blocks: self.blocks,
            total_works_price,
        }
    }
}

fn display_label(manual: Option<&str>, catalog: Option<&str>, fallback: &str) -> String {
    manual
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or(catalog)
        .unwrap_or(fallback)
        .to_string()
}

/// Aggregates the works of a room-based estimate, trusting stored totals.
///
/// # Errors
/// Returns [`Error::InvalidEstimate`] if a work references a catalog entry that
/// was not loaded with it, and [`Error::InvalidAmount`] for invalid quantities
/// or prices.
pub fn aggregate_rooms(rooms: &[RoomGraph], manual: &ManualPriceSet) -> Result<WorksSummary> {
    let mut aggregator = BlockAggregator::new();

    for room in rooms {
        for (work, catalog) in &room.works {
            if work.work_item_id.is_some() && catalog.is_none() {
                return Err(Error::InvalidEstimate {
                    message: format!(
                        "work {} references missing catalog item {:?}",
                        work.id, work.work_item_id
                    ),
                });
            }

            let id = ItemId::Numeric(work.id);
            let base_price = catalog.as_ref().map_or(0.0, |item| item.base_price);
            let is_manual =
                is_manual_price(Some(&id), work.total_price, base_price, work.quantity, manual);

            let price = project_item(
                &PriceInput {
                    quantity: work.quantity,
                    unit_price: work.unit_price,
                    total_price: work.total_price,
                    is_manual,
                },
                PricingPolicy::TrustStoredTotal,
                &ResolvedCoefficients::IDENTITY,
            )?;

            let catalog_name = catalog.as_ref().map(|item| item.name.as_str());
            let catalog_unit = catalog.as_ref().map(|item| item.unit.as_str());
            aggregator.add(
                work.block_title.as_deref(),
                LineItem {
                    id: Some(id),
                    name: display_label(work.name.as_deref(), catalog_name, UNTITLED_NAME),
                    unit: display_label(work.unit.as_deref(), catalog_unit, DEFAULT_UNIT),
                    quantity: work.quantity,
                    unit_price: catalog.as_ref().map_or(work.unit_price, |item| item.base_price),
                    total_price: work.total_price,
                    display_unit_price: price.unit,
                    display_total_price: price.total,
                    work_item_id: work.work_item_id,
                    is_manual_price: is_manual,
                },
            );
        }
    }

    let summary = aggregator.finish();
    debug!(
        "Aggregated {} rooms into {} blocks, total {}",
        rooms.len(),
        summary.blocks.len(),
        summary.total_works_price
    );
    Ok(summary)
}

/// Aggregates a flat-layout estimate, recomputing prices from stored unit prices.
///
/// # Errors
/// Returns [`Error::InvalidAmount`] for invalid quantities or prices.
pub fn aggregate_legacy_blocks(
    layout: &LegacyWorksLayout,
    manual: &ManualPriceSet,
    coefficients: &ResolvedCoefficients,
) -> Result<WorksSummary> {
    let mut aggregator = BlockAggregator::new();

    for block in &layout.blocks {
        for item in &block.items {
            let is_manual = is_manual_price(
                item.id.as_ref(),
                item.total_price,
                item.unit_price,
                item.quantity,
                manual,
            );
            let price = project_item(
                &PriceInput {
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total_price: item.total_price,
                    is_manual,
                },
                PricingPolicy::RecomputeFromCatalog,
                coefficients,
            )?;

            aggregator.add(
                block.title.as_deref(),
                LineItem {
                    id: item.id.clone(),
                    name: display_label(item.name.as_deref(), None, UNTITLED_NAME),
                    unit: display_label(item.unit.as_deref(), None, DEFAULT_UNIT),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total_price: item.total_price,
                    display_unit_price: price.unit,
                    display_total_price: price.total,
                    work_item_id: item.work_item_id,
                    is_manual_price: is_manual,
                },
            );
        }
    }

    Ok(aggregator.finish())
}

/// Prices a flat material list with `normal × final`, without manual overrides.
///
/// # Errors
/// Returns [`Error::InvalidAmount`] for invalid quantities or prices.
#[allow(clippy::cast_precision_loss)]
pub fn aggregate_materials(
    items: &[LegacyItem],
    coefficients: &ResolvedCoefficients,
) -> Result<MaterialsSummary> {
    let mut summary = MaterialsSummary::default();

    for item in items {
        let price = project_item(
            &PriceInput {
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: item.total_price,
                is_manual: false,
            },
            PricingPolicy::RecomputeFromCatalog,
            coefficients,
        )?;

        summary.total_materials_price += price.total;
        summary.items.push(LineItem {
            id: item.id.clone(),
            name: display_label(item.name.as_deref(), None, UNTITLED_NAME),
            unit: display_label(item.unit.as_deref(), None, DEFAULT_UNIT),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
            display_unit_price: price.unit,
            display_total_price: price.total,
            work_item_id: None,
            is_manual_price: false,
        });
    }

    Ok(summary)
}
