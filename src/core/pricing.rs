//! Per-item price projection.
//!
//! Two estimate layouts are priced differently and must stay different:
//!
//! - legacy flat (`apartment`) estimates recompute every display price from the
//!   stored unit price and the resolved coefficients;
//! - room-based (`rooms`) estimates trust the stored total, because the editing
//!   UI already baked the coefficients into it.
//!
//! All money leaving this module is a whole number, rounded half up at the point
//! each display price is computed.

use crate::{
    core::coefficients::ResolvedCoefficients,
    errors::{Error, Result},
};

/// Which projection rule applies to an estimate's line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingPolicy {
    /// Recompute `unit = round(stored unit × coefficients)`, `total = unit × quantity`
    RecomputeFromCatalog,
    /// Pass the stored total through and derive `unit = total / quantity`
    TrustStoredTotal,
}

impl PricingPolicy {
    /// Picks the policy for an estimate `type` column value.
    ///
    /// # Errors
    /// Returns [`Error::InvalidEstimate`] for anything but `"apartment"` or `"rooms"`.
    pub fn for_estimate_type(estimate_type: &str) -> Result<Self> {
        match estimate_type.trim() {
            "apartment" => Ok(Self::RecomputeFromCatalog),
            "rooms" => Ok(Self::TrustStoredTotal),
            other => Err(Error::InvalidEstimate {
                message: format!("unknown estimate type '{other}'"),
            }),
        }
    }
}

/// What the projector needs to know about one line item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceInput {
    /// Item quantity, never negative
    pub quantity: f64,
    /// Stored unit price
    pub unit_price: f64,
    /// Stored total price
    pub total_price: f64,
    /// Whether the total was hand-edited
    pub is_manual: bool,
}

/// Display prices of one line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjectedPrice {
    /// Display unit price
    pub unit: i64,
    /// Display total price
    pub total: i64,
}

/// Rounds a money amount to the nearest whole unit, halves rounding away from
/// zero. Amounts here are never negative, so halves round up.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_money(value: f64) -> i64 {
    value.round() as i64
}

/// `round(total / quantity)`, or 0 when the quantity is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn unit_price_for(total: f64, quantity: f64) -> i64 {
    if quantity > 0.0 {
        round_money(total / quantity)
    } else {
        0
    }
}

fn ensure_valid(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidAmount { amount: value })
    }
}

/// Computes display unit and total prices for one item.
///
/// Under [`PricingPolicy::TrustStoredTotal`] a zero quantity yields a zero price
/// rather than a division by zero.
///
/// # Errors
/// Returns [`Error::InvalidAmount`] if the quantity is negative or any input is
/// not finite.
#[allow(clippy::cast_precision_loss)]
pub fn project_item(
    input: &PriceInput,
    policy: PricingPolicy,
    coefficients: &ResolvedCoefficients,
) -> Result<ProjectedPrice> {
    let quantity = ensure_valid(input.quantity)?;
    if quantity < 0.0 {
        return Err(Error::InvalidAmount { amount: quantity });
    }
    let unit_price = ensure_valid(input.unit_price)?;
    let total_price = ensure_valid(input.total_price)?;

    let projected = match policy {
        PricingPolicy::RecomputeFromCatalog => {
            let multiplier = if input.is_manual {
                coefficients.final_coeff
            } else {
                coefficients.combined()
            };
            let unit = round_money(unit_price * multiplier);
            ProjectedPrice {
                unit,
                total: round_money(unit as f64 * quantity),
            }
        }
        PricingPolicy::TrustStoredTotal if quantity == 0.0 => ProjectedPrice::default(),
        PricingPolicy::TrustStoredTotal => ProjectedPrice {
            unit: unit_price_for(total_price, quantity),
            total: round_money(total_price),
        },
    };

    Ok(projected)
}
