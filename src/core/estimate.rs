//! Estimate graph loading and the estimate-level operations that trigger cache
//! writes: publishing to the client and creating copies or acts.

use crate::{
    config::settings::ExportSettings,
    core::{export, legacy, snapshot::ItemId},
    entities::{
        Estimate, Material, Room, Work, WorkItem, estimate, material, room, work, work_item,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};

/// A room with its works (each joined with its catalog entry) and materials.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomGraph {
    /// The room row
    pub room: room::Model,
    /// Works in id order, each with its catalog entry if it references one
    pub works: Vec<(work::Model, Option<work_item::Model>)>,
    /// Materials in id order
    pub materials: Vec<material::Model>,
}

/// An estimate together with everything pricing reads from it.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateGraph {
    /// The estimate row
    pub estimate: estimate::Model,
    /// Rooms ordered by `sort_order`, then id
    pub rooms: Vec<RoomGraph>,
}

/// Finds an estimate by id.
pub async fn get_estimate_by_id<C>(db: &C, estimate_id: i64) -> Result<Option<estimate::Model>>
where
    C: ConnectionTrait,
{
    Estimate::find_by_id(estimate_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads an estimate with its rooms, works, catalog entries and materials.
///
/// # Errors
/// Returns [`Error::EstimateNotFound`] if the estimate does not exist.
pub async fn load_estimate_graph<C>(db: &C, estimate_id: i64) -> Result<EstimateGraph>
where
    C: ConnectionTrait,
{
    let estimate = get_estimate_by_id(db, estimate_id)
        .await?
        .ok_or(Error::EstimateNotFound { id: estimate_id })?;

    let rooms = Room::find()
        .filter(room::Column::EstimateId.eq(estimate_id))
        .order_by_asc(room::Column::SortOrder)
        .order_by_asc(room::Column::Id)
        .all(db)
        .await?;
    let room_ids: Vec<i64> = rooms.iter().map(|room| room.id).collect();

    let mut works_by_room: HashMap<i64, Vec<(work::Model, Option<work_item::Model>)>> =
        HashMap::new();
    let mut materials_by_room: HashMap<i64, Vec<material::Model>> = HashMap::new();

    if !room_ids.is_empty() {
        let works = Work::find()
            .filter(work::Column::RoomId.is_in(room_ids.clone()))
            .order_by_asc(work::Column::Id)
            .find_also_related(WorkItem)
            .all(db)
            .await?;
        for (work, catalog) in works {
            works_by_room.entry(work.room_id).or_default().push((work, catalog));
        }

        let materials = Material::find()
            .filter(material::Column::RoomId.is_in(room_ids))
            .order_by_asc(material::Column::Id)
            .all(db)
            .await?;
        for material in materials {
            materials_by_room.entry(material.room_id).or_default().push(material);
        }
    }

    let rooms = rooms
        .into_iter()
        .map(|room| RoomGraph {
            works: works_by_room.remove(&room.id).unwrap_or_default(),
            materials: materials_by_room.remove(&room.id).unwrap_or_default(),
            room,
        })
        .collect();

    Ok(EstimateGraph { estimate, rooms })
}

/// Result of [`set_show_to_client`].
#[derive(Debug, Clone)]
pub struct VisibilityChange {
    /// The estimate after the update
    pub estimate: estimate::Model,
    /// Whether the export cache was regenerated as part of the change
    pub cache_regenerated: bool,
}

/// Sets whether the client may see an estimate.
///
/// When visibility turns on, the export cache is regenerated. A regeneration
/// failure is logged and does not fail the toggle. Turning visibility off leaves
/// the cache untouched.
#[instrument(skip(db, settings))]
pub async fn set_show_to_client(
    db: &DatabaseConnection,
    settings: &ExportSettings,
    estimate_id: i64,
    show: bool,
) -> Result<VisibilityChange> {
    let current = get_estimate_by_id(db, estimate_id)
        .await?
        .ok_or(Error::EstimateNotFound { id: estimate_id })?;
    let was_visible = current.show_to_client;

    let mut active: estimate::ActiveModel = current.into();
    active.show_to_client = Set(show);
    active.updated_at = Set(chrono::Utc::now());
    let estimate = active.update(db).await?;

    let mut cache_regenerated = false;
    if show && !was_visible && settings.regenerate_on_publish {
        match export::recompute_export_cache(db, estimate_id).await {
            Ok(_) => cache_regenerated = true,
            Err(e) => error!("Failed to regenerate export cache for estimate {estimate_id}: {e}"),
        }
    }

    info!("Estimate {estimate_id} visibility set to {show}");
    Ok(VisibilityChange {
        estimate,
        cache_regenerated,
    })
}

/// Rewrites numeric ids in a `manualPrices` list through `mapping`, keeping ids
/// that are not in the mapping.
fn remap_manual_prices(raw: Option<&str>, mapping: &HashMap<i64, i64>) -> Result<Option<String>> {
    if raw.is_none() {
        return Ok(None);
    }
    let ids: Vec<ItemId> = legacy::parse_id_list(raw, "manualPrices")
        .into_iter()
        .map(|id| match id.key().parse::<i64>().ok().and_then(|old| mapping.get(&old)) {
            Some(&new) => ItemId::Numeric(new),
            None => id,
        })
        .collect();
    Ok(Some(serde_json::to_string(&ids)?))
}

/// Deep-copies an estimate with its rooms, works and materials.
///
/// With `as_act` the copy is marked as an act and receives an export cache: the
/// source's cache copied verbatim, or a fresh recomputation when
/// `copy_cache_into_acts` is off. Plain copies get no cache until recomputed.
/// The copy is never visible to the client initially.
#[instrument(skip(db, settings))]
pub async fn duplicate_estimate(
    db: &DatabaseConnection,
    settings: &ExportSettings,
    source_id: i64,
    as_act: bool,
) -> Result<estimate::Model> {
    let txn = db.begin().await?;
    let source = load_estimate_graph(&txn, source_id).await?;
    let now = chrono::Utc::now();

    let copy = estimate::ActiveModel {
        title: Set(source.estimate.title.clone()),
        estimate_type: Set(source.estimate.estimate_type.clone()),
        category: Set(source.estimate.category.clone()),
        client_id: Set(source.estimate.client_id),
        creator_id: Set(source.estimate.creator_id),
        show_to_client: Set(false),
        is_act: Set(as_act),
        notes: Set(source.estimate.notes.clone()),
        works_block: Set(source.estimate.works_block.clone()),
        materials_block: Set(source.estimate.materials_block.clone()),
        summary_works_block: Set(source.estimate.summary_works_block.clone()),
        summary_materials_block: Set(source.estimate.summary_materials_block.clone()),
        manual_prices: Set(source.estimate.manual_prices.clone()),
        coefficients_data: Set(source.estimate.coefficients_data.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut work_ids = HashMap::new();
    for graph in &source.rooms {
        let room = room::ActiveModel {
            estimate_id: Set(copy.id),
            name: Set(graph.room.name.clone()),
            sort_order: Set(graph.room.sort_order),
            total_works_price: Set(graph.room.total_works_price),
            total_materials_price: Set(graph.room.total_materials_price),
            total_price: Set(graph.room.total_price),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for (work, _) in &graph.works {
            let copied = work::ActiveModel {
                room_id: Set(room.id),
                work_item_id: Set(work.work_item_id),
                block_title: Set(work.block_title.clone()),
                name: Set(work.name.clone()),
                unit: Set(work.unit.clone()),
                quantity: Set(work.quantity),
                unit_price: Set(work.unit_price),
                total_price: Set(work.total_price),
                description: Set(work.description.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            work_ids.insert(work.id, copied.id);
        }

        for material in &graph.materials {
            material::ActiveModel {
                room_id: Set(room.id),
                name: Set(material.name.clone()),
                unit: Set(material.unit.clone()),
                quantity: Set(material.quantity),
                unit_price: Set(material.unit_price),
                total_price: Set(material.total_price),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }

    // Room works get new ids, so the manual list must follow them
    let copy = if work_ids.is_empty() {
        copy
    } else {
        let manual_prices = remap_manual_prices(copy.manual_prices.as_deref(), &work_ids)?;
        let mut active: estimate::ActiveModel = copy.into();
        active.manual_prices = Set(manual_prices);
        active.update(&txn).await?
    };

    if as_act && settings.copy_cache_into_acts {
        if export::copy_export_cache(&txn, source_id, copy.id).await?.is_none() {
            warn!(
                "Source estimate {source_id} has no export cache; act {} has none either",
                copy.id
            );
        }
    } else if as_act {
        // Rolls the whole copy back if the act cannot be priced
        let snapshot = export::compute_export_for(&txn, copy.id).await?;
        export::write_export_cache(&txn, copy.id, &snapshot).await?;
    }
    txn.commit().await?;

    info!(
        "Estimate {source_id} copied to {} (act: {as_act}, {} works)",
        copy.id,
        work_ids.len()
    );
    Ok(copy)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::export::CacheStatus, entities::EstimateExport, test_utils::*};

    #[tokio::test]
    async fn test_load_estimate_graph() -> Result<()> {
        let db = setup_test_db().await?;
        let estimate = create_custom_estimate(&db, "rooms", None, None).await?;
        let kitchen = create_test_room(&db, estimate.id, "Кухня").await?;
        let hall = create_test_room(&db, estimate.id, "Коридор").await?;
        let catalog = create_test_work_item(&db, "Плитка", "м²", 1200.0).await?;
        create_test_work(&db, kitchen.id, Some(catalog.id), Some("Плитка"), 2.0, 2400.0).await?;
        create_test_work(&db, hall.id, None, None, 1.0, 500.0).await?;
        create_test_material(&db, hall.id, "Клей", 3.0, 900.0).await?;

        let graph = load_estimate_graph(&db, estimate.id).await?;
        assert_eq!(graph.rooms.len(), 2);
        assert_eq!(graph.rooms[0].room.id, kitchen.id);
        assert_eq!(graph.rooms[0].works.len(), 1);
        assert_eq!(graph.rooms[0].works[0].1.as_ref().unwrap().id, catalog.id);
        assert!(graph.rooms[1].works[0].1.is_none());
        assert_eq!(graph.rooms[1].materials.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_estimate() -> Result<()> {
        let db = setup_test_db().await?;
        let result = load_estimate_graph(&db, 404).await;
        assert!(matches!(result, Err(Error::EstimateNotFound { id: 404 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_publishing_regenerates_cache() -> Result<()> {
        let (db, estimate) = setup_with_room_estimate().await?;
        let settings = ExportSettings::default();

        let change = set_show_to_client(&db, &settings, estimate.id, true).await?;
        assert!(change.estimate.show_to_client);
        assert!(change.cache_regenerated);
        assert_eq!(
            export::check_cache_drift(&db, estimate.id).await?,
            CacheStatus::Fresh
        );

        // Already visible: no second regeneration
        let change = set_show_to_client(&db, &settings, estimate.id, true).await?;
        assert!(!change.cache_regenerated);

        // Hiding keeps the cache
        let change = set_show_to_client(&db, &settings, estimate.id, false).await?;
        assert!(!change.estimate.show_to_client);
        assert!(export::get_export_cache(&db, estimate.id).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_publishing_respects_settings() -> Result<()> {
        let (db, estimate) = setup_with_room_estimate().await?;
        let settings = ExportSettings {
            regenerate_on_publish: false,
            ..ExportSettings::default()
        };

        let change = set_show_to_client(&db, &settings, estimate.id, true).await?;
        assert!(!change.cache_regenerated);
        assert!(export::get_export_cache(&db, estimate.id).await.unwrap_err().is_missing_cache());
        Ok(())
    }

    #[tokio::test]
    async fn test_publishing_survives_regeneration_failure() -> Result<()> {
        let db = setup_test_db().await?;
        let estimate = create_custom_estimate(&db, "villa", None, None).await?;

        let change = set_show_to_client(&db, &ExportSettings::default(), estimate.id, true).await?;
        assert!(change.estimate.show_to_client);
        assert!(!change.cache_regenerated);
        Ok(())
    }

    #[tokio::test]
    async fn test_act_copies_cache_verbatim() -> Result<()> {
        let (db, source) = setup_with_room_estimate().await?;
        let settings = ExportSettings::default();
        export::recompute_export_cache(&db, source.id).await?;

        // Edit the source after its cache was written
        let room = Room::find().one(&db).await?.unwrap();
        create_test_work(&db, room.id, None, None, 1.0, 700.0).await?;

        let act = duplicate_estimate(&db, &settings, source.id, true).await?;
        assert!(act.is_act);
        assert!(!act.show_to_client);

        let source_cache = export::get_export_cache(&db, source.id).await?;
        let act_cache = export::get_export_cache(&db, act.id).await?;
        assert_eq!(act_cache, source_cache);
        // The copied cache predates the edit
        assert!(matches!(
            export::check_cache_drift(&db, act.id).await?,
            CacheStatus::Stale { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_act_recomputes_when_configured() -> Result<()> {
        let (db, source) = setup_with_room_estimate().await?;
        let settings = ExportSettings {
            copy_cache_into_acts: false,
            ..ExportSettings::default()
        };

        let act = duplicate_estimate(&db, &settings, source.id, true).await?;
        assert_eq!(
            export::check_cache_drift(&db, act.id).await?,
            CacheStatus::Fresh
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unpriceable_act_is_rolled_back() -> Result<()> {
        let db = setup_test_db().await?;
        let source = create_custom_estimate(&db, "villa", None, None).await?;
        create_test_room(&db, source.id, "Терраса").await?;
        let settings = ExportSettings {
            copy_cache_into_acts: false,
            ..ExportSettings::default()
        };

        let result = duplicate_estimate(&db, &settings, source.id, true).await;
        assert!(matches!(result, Err(Error::InvalidEstimate { .. })));
        assert_eq!(Estimate::find().all(&db).await?.len(), 1);
        assert_eq!(Room::find().all(&db).await?.len(), 1);
        assert!(EstimateExport::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_copy_duplicates_structure_and_remaps_manual_prices() -> Result<()> {
        let db = setup_test_db().await?;
        let estimate = create_custom_estimate(&db, "rooms", None, None).await?;
        let room = create_test_room(&db, estimate.id, "Спальня").await?;
        let work = create_test_work(&db, room.id, None, None, 2.0, 800.0).await?;
        create_test_material(&db, room.id, "Краска", 1.0, 1500.0).await?;

        let mut active: estimate::ActiveModel = estimate.into();
        active.manual_prices = Set(Some(format!("[{}, \"legacy\"]", work.id)));
        let estimate = active.update(&db).await?;

        let copy = duplicate_estimate(&db, &ExportSettings::default(), estimate.id, false).await?;
        assert!(!copy.is_act);
        assert!(EstimateExport::find().all(&db).await?.is_empty());

        let graph = load_estimate_graph(&db, copy.id).await?;
        assert_eq!(graph.rooms.len(), 1);
        assert_eq!(graph.rooms[0].room.name, "Спальня");
        assert_eq!(graph.rooms[0].materials.len(), 1);
        let new_work_id = graph.rooms[0].works[0].0.id;
        assert_ne!(new_work_id, work.id);

        let ids = legacy::parse_id_list(copy.manual_prices.as_deref(), "manualPrices");
        assert_eq!(
            ids,
            vec![ItemId::Numeric(new_work_id), ItemId::Text("legacy".to_string())]
        );
        Ok(())
    }
}
