//! Export cache computation and persistence.
//!
//! The cache row is a denormalized snapshot of one estimate's prices. It is
//! written with upsert semantics, read verbatim by the client portal, and may be
//! regenerated from the live estimate graph at any time. Nothing invalidates it
//! automatically when rooms or works are edited; [`check_cache_drift`] exists to
//! detect that case.

use crate::{
    config::settings::ExportSettings,
    core::{
        coefficients::{load_active_coefficients, resolve_coefficients},
        estimate::{EstimateGraph, load_estimate_graph},
        grouping::{
            MaterialsSummary, aggregate_legacy_blocks, aggregate_materials, aggregate_rooms,
        },
        legacy,
        manual::ManualPriceSet,
        pricing::PricingPolicy,
        snapshot::ExportSnapshot,
    },
    entities::{Estimate, EstimateExport, coefficient, estimate, estimate_export},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::OnConflict};
use tracing::{debug, error, info, instrument, warn};

/// Computes the export snapshot of an estimate graph. Pure.
///
/// Room-based estimates trust stored work totals and have no materials section.
/// Flat-layout estimates recompute works and materials from their serialized
/// blocks.
///
/// # Errors
/// Returns [`Error::InvalidEstimate`] for an unknown estimate type or a dangling
/// catalog reference, and [`Error::InvalidAmount`] for invalid item amounts.
pub fn compute_export(
    graph: &EstimateGraph,
    coefficients: &[coefficient::Model],
) -> Result<ExportSnapshot> {
    let estimate = &graph.estimate;
    let policy = PricingPolicy::for_estimate_type(&estimate.estimate_type)?;
    let resolved = resolve_coefficients(coefficients);
    let manual = ManualPriceSet::parse(estimate.manual_prices.as_deref());

    let (works, materials) = match policy {
        PricingPolicy::TrustStoredTotal => (
            aggregate_rooms(&graph.rooms, &manual)?,
            MaterialsSummary::default(),
        ),
        PricingPolicy::RecomputeFromCatalog => {
            let layout = legacy::parse_works_layout(estimate.works_block.as_deref());
            let materials = legacy::parse_materials_layout(estimate.materials_block.as_deref());
            (
                aggregate_legacy_blocks(&layout, &manual, &resolved)?,
                aggregate_materials(&materials, &resolved)?,
            )
        }
    };

    debug!(
        "Computed export for estimate {} ({:?}): works={}, materials={}",
        estimate.id, policy, works.total_works_price, materials.total_materials_price
    );
    Ok(ExportSnapshot::new(&works, &materials, resolved, coefficients))
}

/// Loads an estimate with its active coefficients and computes its snapshot.
pub async fn compute_export_for<C>(db: &C, estimate_id: i64) -> Result<ExportSnapshot>
where
    C: ConnectionTrait,
{
    let graph = load_estimate_graph(db, estimate_id).await?;
    let coefficients = load_active_coefficients(db, &graph.estimate).await?;
    compute_export(&graph, &coefficients)
}

/// Creates or replaces the cache row for an estimate.
///
/// A single `INSERT .. ON CONFLICT (estimate_id) DO UPDATE`, so concurrent
/// writers for the same estimate resolve to last-writer-wins. `created_at` keeps
/// the value of the first write. Writing the same snapshot twice leaves the same
/// row apart from `updated_at`.
pub async fn write_export_cache<C>(
    db: &C,
    estimate_id: i64,
    snapshot: &ExportSnapshot,
) -> Result<estimate_export::Model>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now();
    let mut row = estimate_export::ActiveModel {
        estimate_id: Set(estimate_id),
        created_at: Set(now),
        ..Default::default()
    };
    apply_snapshot(&mut row, snapshot, now)?;

    EstimateExport::insert(row)
        .on_conflict(
            OnConflict::column(estimate_export::Column::EstimateId)
                .update_columns([
                    estimate_export::Column::WorksData,
                    estimate_export::Column::MaterialsData,
                    estimate_export::Column::TotalWorksPrice,
                    estimate_export::Column::TotalMaterialsPrice,
                    estimate_export::Column::GrandTotal,
                    estimate_export::Column::CoefficientsInfo,
                    estimate_export::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    let saved = find_cache_row(db, estimate_id)
        .await?
        .ok_or(Error::MissingCache { estimate_id })?;
    info!(
        "Export cache written for estimate {estimate_id}: grand total {}",
        saved.grand_total
    );
    Ok(saved)
}

fn apply_snapshot(
    row: &mut estimate_export::ActiveModel,
    snapshot: &ExportSnapshot,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<()> {
    row.works_data = Set(snapshot.works_json()?);
    row.materials_data = Set(snapshot.materials_json()?);
    row.total_works_price = Set(snapshot.total_works_price);
    row.total_materials_price = Set(snapshot.total_materials_price);
    row.grand_total = Set(snapshot.grand_total);
    row.coefficients_info = Set(snapshot.coefficients_json()?);
    row.updated_at = Set(now);
    Ok(())
}

/// Recomputes an estimate's cache from live data.
///
/// Reading the graph and writing the row happen in one database transaction.
#[instrument(skip(db))]
pub async fn recompute_export_cache(
    db: &DatabaseConnection,
    estimate_id: i64,
) -> Result<estimate_export::Model> {
    let txn = db.begin().await?;
    let snapshot = compute_export_for(&txn, estimate_id).await?;
    let row = write_export_cache(&txn, estimate_id, &snapshot).await?;
    txn.commit().await?;
    Ok(row)
}

/// Outcome of a batch recompute.
#[derive(Debug, Clone, Default)]
pub struct RecomputeReport {
    /// Estimates whose cache was written
    pub succeeded: Vec<i64>,
    /// Estimates that failed, with the error message
    pub failed: Vec<(i64, String)>,
}

/// Recomputes the cache of every estimate. A failing estimate is logged and
/// reported but does not stop the batch.
#[instrument(skip(db))]
pub async fn recompute_all_export_caches(db: &DatabaseConnection) -> Result<RecomputeReport> {
    let ids: Vec<i64> = Estimate::find()
        .select_only()
        .column(estimate::Column::Id)
        .order_by_asc(estimate::Column::Id)
        .into_tuple()
        .all(db)
        .await?;

    let mut report = RecomputeReport::default();
    for id in ids {
        match recompute_export_cache(db, id).await {
            Ok(_) => report.succeeded.push(id),
            Err(e) => {
                error!("Failed to recompute export cache for estimate {id}: {e}");
                report.failed.push((id, e.to_string()));
            }
        }
    }

    info!(
        "Recomputed {} export caches, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    Ok(report)
}

async fn find_cache_row<C>(db: &C, estimate_id: i64) -> Result<Option<estimate_export::Model>>
where
    C: ConnectionTrait,
{
    EstimateExport::find()
        .filter(estimate_export::Column::EstimateId.eq(estimate_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Reads an estimate's cache.
///
/// # Errors
/// Returns [`Error::MissingCache`] when no cache has been generated yet.
pub async fn get_export_cache<C>(db: &C, estimate_id: i64) -> Result<ExportSnapshot>
where
    C: ConnectionTrait,
{
    let row = find_cache_row(db, estimate_id)
        .await?
        .ok_or(Error::MissingCache { estimate_id })?;
    ExportSnapshot::from_row(&row)
}

/// Reads an estimate's cache, first comparing it with live data when
/// `check_drift_on_read` is enabled. Drift, and any failure to recompute the
/// live side, is logged; the stored snapshot is still returned.
pub async fn read_export_cache(
    db: &DatabaseConnection,
    settings: &ExportSettings,
    estimate_id: i64,
) -> Result<ExportSnapshot> {
    if settings.check_drift_on_read {
        if let Err(e) = check_cache_drift(db, estimate_id).await {
            warn!("Drift check failed for estimate {estimate_id}, serving stored cache: {e}");
        }
    }
    get_export_cache(db, estimate_id).await
}

/// How a stored cache relates to the live estimate graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// No cache row exists
    Missing,
    /// The cache matches a fresh recomputation
    Fresh,
    /// The cache differs from a fresh recomputation
    Stale {
        /// Grand total in the stored row
        cached_grand_total: i64,
        /// Grand total computed from live data
        live_grand_total: i64,
    },
}

/// Compares an estimate's cache with a recomputation from live data without
/// writing anything.
pub async fn check_cache_drift<C>(db: &C, estimate_id: i64) -> Result<CacheStatus>
where
    C: ConnectionTrait,
{
    let cached = match get_export_cache(db, estimate_id).await {
        Ok(cached) => cached,
        Err(Error::MissingCache { .. }) => return Ok(CacheStatus::Missing),
        Err(e) => return Err(e),
    };
    let live = compute_export_for(db, estimate_id).await?;

    let same = cached.works == live.works
        && cached.materials == live.materials
        && cached.total_works_price == live.total_works_price
        && cached.total_materials_price == live.total_materials_price
        && cached.grand_total == live.grand_total
        && cached.coefficients == live.coefficients;

    if same {
        Ok(CacheStatus::Fresh)
    } else {
        warn!(
            "Export cache for estimate {estimate_id} is stale: cached grand total {}, live {}",
            cached.grand_total, live.grand_total
        );
        Ok(CacheStatus::Stale {
            cached_grand_total: cached.grand_total,
            live_grand_total: live.grand_total,
        })
    }
}

/// Copies the cache row of `source_id` to `target_id` verbatim.
///
/// Returns `None` if the source has no cache. The copy reflects the source's
/// data at the time its cache was written, which may already be stale.
pub async fn copy_export_cache<C>(
    db: &C,
    source_id: i64,
    target_id: i64,
) -> Result<Option<estimate_export::Model>>
where
    C: ConnectionTrait,
{
    let Some(source) = find_cache_row(db, source_id).await? else {
        return Ok(None);
    };

    let snapshot = ExportSnapshot::from_row(&source)?;
    warn!(
        "Copying export cache of estimate {source_id} to {target_id} without recomputing; \
         it reflects the source as of {}",
        source.updated_at
    );
    write_export_cache(db, target_id, &snapshot).await.map(Some)
}
