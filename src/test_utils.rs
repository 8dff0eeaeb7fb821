//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    entities::{coefficient, estimate, material, room, work, work_item},
    errors::Result,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an estimate of the given type.
///
/// # Defaults
/// * `title`: "Тестовая смета"
/// * `client_id`: 1
/// * not visible to the client, not an act, no legacy blocks
pub async fn create_custom_estimate(
    db: &DatabaseConnection,
    estimate_type: &str,
    coefficients_data: Option<String>,
    manual_prices: Option<String>,
) -> Result<estimate::Model> {
    let now = chrono::Utc::now();
    estimate::ActiveModel {
        title: Set("Тестовая смета".to_string()),
        estimate_type: Set(estimate_type.to_string()),
        category: Set(None),
        client_id: Set(1),
        creator_id: Set(None),
        show_to_client: Set(false),
        is_act: Set(false),
        notes: Set(None),
        works_block: Set(None),
        materials_block: Set(None),
        summary_works_block: Set(None),
        summary_materials_block: Set(None),
        manual_prices: Set(manual_prices),
        coefficients_data: Set(coefficients_data),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Stores flat-layout works and materials blobs on an estimate.
pub async fn set_legacy_blocks(
    db: &DatabaseConnection,
    estimate: estimate::Model,
    works_block: &str,
    materials_block: &str,
) -> Result<estimate::Model> {
    let mut active: estimate::ActiveModel = estimate.into();
    active.works_block = Set(Some(works_block.to_string()));
    active.materials_block = Set(Some(materials_block.to_string()));
    active.update(db).await.map_err(Into::into)
}

/// Creates a room with zeroed cached totals.
pub async fn create_test_room(
    db: &DatabaseConnection,
    estimate_id: i64,
    name: &str,
) -> Result<room::Model> {
    room::ActiveModel {
        estimate_id: Set(estimate_id),
        name: Set(name.to_string()),
        sort_order: Set(0),
        total_works_price: Set(0.0),
        total_materials_price: Set(0.0),
        total_price: Set(0.0),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates an active catalog entry.
pub async fn create_test_work_item(
    db: &DatabaseConnection,
    name: &str,
    unit: &str,
    base_price: f64,
) -> Result<work_item::Model> {
    work_item::ActiveModel {
        name: Set(name.to_string()),
        unit: Set(unit.to_string()),
        base_price: Set(base_price),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a work with the given stored total.
///
/// # Defaults
/// * `unit_price`: `total_price / quantity`, or 0 for a zero quantity
/// * no manual name or unit, no description
pub async fn create_test_work(
    db: &DatabaseConnection,
    room_id: i64,
    work_item_id: Option<i64>,
    block_title: Option<&str>,
    quantity: f64,
    total_price: f64,
) -> Result<work::Model> {
    let unit_price = if quantity > 0.0 {
        total_price / quantity
    } else {
        0.0
    };

    work::ActiveModel {
        room_id: Set(room_id),
        work_item_id: Set(work_item_id),
        block_title: Set(block_title.map(str::to_string)),
        name: Set(None),
        unit: Set(None),
        quantity: Set(quantity),
        unit_price: Set(unit_price),
        total_price: Set(total_price),
        description: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a material measured in pieces.
pub async fn create_test_material(
    db: &DatabaseConnection,
    room_id: i64,
    name: &str,
    quantity: f64,
    total_price: f64,
) -> Result<material::Model> {
    material::ActiveModel {
        room_id: Set(room_id),
        name: Set(name.to_string()),
        unit: Set("шт".to_string()),
        quantity: Set(quantity),
        unit_price: Set(total_price / quantity),
        total_price: Set(total_price),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a catalog coefficient.
pub async fn create_test_coefficient(
    db: &DatabaseConnection,
    name: &str,
    value: f64,
    coefficient_type: Option<&str>,
    is_active: bool,
) -> Result<coefficient::Model> {
    coefficient::ActiveModel {
        name: Set(name.to_string()),
        value: Set(value),
        coefficient_type: Set(coefficient_type.map(str::to_string)),
        is_active: Set(is_active),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Sets up a room-based estimate with one room and one auto-priced work
/// (4 m² of plaster at 250, stored total 1000).
/// Returns (db, estimate) for common test scenarios.
pub async fn setup_with_room_estimate() -> Result<(DatabaseConnection, estimate::Model)> {
    let db = setup_test_db().await?;
    let estimate = create_custom_estimate(&db, "rooms", None, None).await?;
    let room = create_test_room(&db, estimate.id, "Гостиная").await?;
    let plaster = create_test_work_item(&db, "Штукатурка", "м²", 250.0).await?;
    create_test_work(&db, room.id, Some(plaster.id), Some("Отделка"), 4.0, 1000.0).await?;
    Ok((db, estimate))
}
