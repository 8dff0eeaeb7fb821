//! Coefficient resolution.
//!
//! An estimate references a subset of the global coefficient catalog. The
//! resolver partitions the active ones by role and folds each partition into a
//! single multiplier. Resolution is a pure function; loading the active list from
//! the database lives here too because it shares the id-list parsing rules.

use crate::{
    core::legacy,
    entities::{Coefficient, coefficient, estimate},
    errors::Result,
};
use sea_orm::{ConnectionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Name under which older catalogs mark the global coefficient.
///
/// Newer rows use `type = "global"` instead; both are recognised.
pub const GLOBAL_COEFFICIENT_NAME: &str = "Глобальный коэффициент";

/// How a coefficient participates in pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoefficientRole {
    /// Applied to auto-priced items only
    Normal,
    /// Applied to every item, manual or not
    Final,
    /// Reported for display, folded into neither product
    Global,
    /// Unknown discriminator, ignored
    Unknown,
}

impl CoefficientRole {
    /// Classifies a coefficient by its `type` column.
    #[must_use]
    pub fn of(model: &coefficient::Model) -> Self {
        match model.coefficient_type.as_deref().map(str::trim) {
            None | Some("" | "normal") => Self::Normal,
            Some("final") => Self::Final,
            Some("global") => Self::Global,
            Some(_) => Self::Unknown,
        }
    }
}

/// The three multipliers every pricing policy works with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCoefficients {
    /// Product of all `normal` coefficients
    pub normal: f64,
    /// Product of all `final` coefficients
    #[serde(rename = "final")]
    pub final_coeff: f64,
    /// Value of the global coefficient, 1 when none is present
    pub global: f64,
}

impl ResolvedCoefficients {
    /// All multipliers equal to one.
    pub const IDENTITY: Self = Self {
        normal: 1.0,
        final_coeff: 1.0,
        global: 1.0,
    };

    /// Multiplier applied to an auto-priced item: `normal × final`.
    ///
    /// Materials use this uniformly; the legacy "global" multiplier is treated as
    /// an alias for it rather than a fourth factor.
    #[must_use]
    pub fn combined(&self) -> f64 {
        self.normal * self.final_coeff
    }
}

impl Default for ResolvedCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Folds a list of coefficients into normal, final and global multipliers.
///
/// An empty list yields the identity.
#[must_use]
pub fn resolve_coefficients(coefficients: &[coefficient::Model]) -> ResolvedCoefficients {
    let mut resolved = ResolvedCoefficients::IDENTITY;
    let mut global = None;

    for coefficient in coefficients {
        let role = CoefficientRole::of(coefficient);
        match role {
            CoefficientRole::Normal => resolved.normal *= coefficient.value,
            CoefficientRole::Final => resolved.final_coeff *= coefficient.value,
            CoefficientRole::Global => {}
            CoefficientRole::Unknown => {
                warn!(
                    "Ignoring coefficient {} with unknown type {:?}",
                    coefficient.id, coefficient.coefficient_type
                );
            }
        }

        let is_global =
            role == CoefficientRole::Global || coefficient.name == GLOBAL_COEFFICIENT_NAME;
        if is_global && global.is_none() {
            global = Some(coefficient.value);
        }
    }

    resolved.global = global.unwrap_or(1.0);
    debug!(
        "Resolved {} coefficients: normal={}, final={}, global={}",
        coefficients.len(),
        resolved.normal,
        resolved.final_coeff,
        resolved.global
    );
    resolved
}

/// Loads the active coefficients an estimate references, in the order the
/// estimate lists them.
///
/// Ids that are not numeric, unknown, or inactive are skipped. A malformed
/// `coefficients_data` field yields an empty list.
pub async fn load_active_coefficients<C>(
    db: &C,
    estimate: &estimate::Model,
) -> Result<Vec<coefficient::Model>>
where
    C: ConnectionTrait,
{
    let ids: Vec<i64> =
        legacy::parse_id_list(estimate.coefficients_data.as_deref(), "coefficientsData")
            .into_iter()
            .filter_map(|id| id.key().parse().ok())
            .collect();

    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut coefficients = Coefficient::find()
        .filter(coefficient::Column::Id.is_in(ids.clone()))
        .filter(coefficient::Column::IsActive.eq(true))
        .all(db)
        .await?;

    coefficients.sort_by_key(|c| ids.iter().position(|id| *id == c.id));
    Ok(coefficients)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn coeff(id: i64, name: &str, value: f64, kind: Option<&str>) -> coefficient::Model {
        coefficient::Model {
            id,
            name: name.to_string(),
            value,
            coefficient_type: kind.map(str::to_string),
            is_active: true,
        }
    }

    #[test]
    fn test_empty_list_is_identity() {
        let resolved = resolve_coefficients(&[]);
        assert_eq!(resolved.normal, 1.0);
        assert_eq!(resolved.final_coeff, 1.0);
        assert_eq!(resolved.global, 1.0);
    }

    #[test]
    fn test_normal_coefficients_multiply() {
        let resolved = resolve_coefficients(&[
            coeff(1, "Высота потолков", 2.0, Some("normal")),
            coeff(2, "Сложность", 3.0, Some("normal")),
        ]);
        assert_eq!(resolved.normal, 6.0);
        assert_eq!(resolved.final_coeff, 1.0);
    }

    #[test]
    fn test_untyped_counts_as_normal_and_final_is_separate() {
        let resolved = resolve_coefficients(&[
            coeff(1, "Старый фонд", 1.5, None),
            coeff(2, "Срочность", 1.1, Some("final")),
            coeff(3, "Выходные", 2.0, Some("final")),
        ]);
        assert_eq!(resolved.normal, 1.5);
        assert_eq!(resolved.final_coeff, 2.2);
        assert_eq!(resolved.combined(), 1.5 * 2.2);
    }

    #[test]
    fn test_global_by_legacy_name() {
        let resolved = resolve_coefficients(&[coeff(1, GLOBAL_COEFFICIENT_NAME, 1.3, None)]);
        assert_eq!(resolved.global, 1.3);
        // An untyped legacy global still folds into the normal product
        assert_eq!(resolved.normal, 1.3);
    }

    #[test]
    fn test_global_by_type_is_not_folded() {
        let resolved = resolve_coefficients(&[coeff(1, "Регион", 1.4, Some("global"))]);
        assert_eq!(resolved.global, 1.4);
        assert_eq!(resolved.normal, 1.0);
        assert_eq!(resolved.final_coeff, 1.0);
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let resolved = resolve_coefficients(&[coeff(1, "?", 9.0, Some("bonus"))]);
        assert_eq!(resolved, ResolvedCoefficients::IDENTITY);
    }

    #[tokio::test]
    async fn test_load_active_coefficients_keeps_listed_order() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_coefficient(&db, "Первый", 1.1, None, true).await?;
        let second = create_test_coefficient(&db, "Второй", 1.2, Some("final"), true).await?;
        let inactive = create_test_coefficient(&db, "Выключен", 5.0, None, false).await?;

        let ids = format!("[{}, \"{}\", {}, 999]", second.id, first.id, inactive.id);
        let estimate = create_custom_estimate(&db, "rooms", Some(ids), None).await?;

        let loaded = load_active_coefficients(&db, &estimate).await?;
        let loaded_ids: Vec<i64> = loaded.iter().map(|c| c.id).collect();
        assert_eq!(loaded_ids, vec![second.id, first.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_active_coefficients_fails_open() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_coefficient(&db, "Первый", 1.1, None, true).await?;
        let estimate =
            create_custom_estimate(&db, "rooms", Some("not json".to_string()), None).await?;

        let loaded = load_active_coefficients(&db, &estimate).await?;
        assert!(loaded.is_empty());
        Ok(())
    }
}
