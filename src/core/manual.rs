//! Manual price classification.
//!
//! A line item counts as manually priced when its stored total differs from
//! `round(base price × quantity)`, or when its id is listed in the estimate's
//! `manualPrices` field. The comparison is exact: any rounding drift between the
//! stored and the expected total classifies an auto-priced item as manual.

use crate::core::{legacy, pricing::round_money, snapshot::ItemId};
use std::collections::HashSet;

/// Ids an estimate explicitly marks as hand-priced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualPriceSet {
    keys: HashSet<String>,
}

impl ManualPriceSet {
    /// Builds a set from item ids.
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = ItemId>,
    {
        Self {
            keys: ids.into_iter().map(|id| id.key()).collect(),
        }
    }

    /// Parses the estimate's `manualPrices` column. Missing or malformed input
    /// yields an empty set.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        Self::from_ids(legacy::parse_id_list(raw, "manualPrices"))
    }

    /// Whether `id` is listed, comparing normalised keys.
    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.keys.contains(&id.key())
    }

    /// Number of distinct listed ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no id is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Total an auto-priced item would have: `round(base_price × quantity)`.
#[must_use]
pub fn expected_auto_price(base_price: f64, quantity: f64) -> i64 {
    round_money(base_price * quantity)
}

/// Decides whether an item's price was overridden by hand.
///
/// `base_price` is the catalog price of the referenced work item, or 0 when the
/// item has no catalog reference.
#[must_use]
pub fn is_manual_price(
    id: Option<&ItemId>,
    stored_total: f64,
    base_price: f64,
    quantity: f64,
    manual: &ManualPriceSet,
) -> bool {
    #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
    let drifted = stored_total != expected_auto_price(base_price, quantity) as f64;
    drifted || id.is_some_and(|id| manual.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_total_is_auto_unless_listed() {
        let id = ItemId::Numeric(4);
        let empty = ManualPriceSet::default();
        assert!(!is_manual_price(Some(&id), 200.0, 100.0, 2.0, &empty));

        let listed = ManualPriceSet::from_ids([ItemId::Numeric(4)]);
        assert!(is_manual_price(Some(&id), 200.0, 100.0, 2.0, &listed));
    }

    #[test]
    fn test_diverging_total_is_manual_regardless_of_set() {
        let id = ItemId::Numeric(4);
        let empty = ManualPriceSet::default();
        assert!(is_manual_price(Some(&id), 250.0, 100.0, 2.0, &empty));

        let other = ManualPriceSet::from_ids([ItemId::Numeric(5)]);
        assert!(is_manual_price(Some(&id), 250.0, 100.0, 2.0, &other));
    }

    #[test]
    fn test_expected_price_rounds_half_up() {
        assert_eq!(expected_auto_price(33.5, 1.0), 34);
        assert_eq!(expected_auto_price(10.0, 0.25), 3);
        assert!(!is_manual_price(None, 34.0, 33.5, 1.0, &ManualPriceSet::default()));
    }

    #[test]
    fn test_no_catalog_reference_means_zero_base() {
        let set = ManualPriceSet::default();
        assert!(!is_manual_price(None, 0.0, 0.0, 3.0, &set));
        assert!(is_manual_price(None, 1500.0, 0.0, 3.0, &set));
    }

    #[test]
    fn test_parse_accepts_mixed_ids_and_fails_open() {
        let set = ManualPriceSet::parse(Some(r#"[1, "2", "legacy-7"]"#));
        assert_eq!(set.len(), 3);
        assert!(set.contains(&ItemId::Numeric(2)));
        assert!(set.contains(&ItemId::Text("1".to_string())));
        assert!(set.contains(&ItemId::Text("legacy-7".to_string())));

        assert!(ManualPriceSet::parse(Some("{broken")).is_empty());
        assert!(ManualPriceSet::parse(None).is_empty());
    }
}
