//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust models.

use crate::entities::{
    Coefficient, Estimate, EstimateExport, Material, Room, Work, WorkItem,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/estimates.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back
/// to a local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables from entity definitions if they do not exist yet.
///
/// Parents are created before children so foreign keys resolve.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let statements = vec![
        schema.create_table_from_entity(WorkItem),
        schema.create_table_from_entity(Coefficient),
        schema.create_table_from_entity(Estimate),
        schema.create_table_from_entity(Room),
        schema.create_table_from_entity(Work),
        schema.create_table_from_entity(Material),
        schema.create_table_from_entity(EstimateExport),
    ];

    for mut statement in statements {
        statement.if_not_exists();
        db.execute(builder.build(&statement)).await?;
    }

    info!("Database tables ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EstimateExportModel, EstimateModel, WorkModel};
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let _: Vec<EstimateModel> = Estimate::find().limit(1).all(&db).await?;
        let _: Vec<WorkModel> = Work::find().limit(1).all(&db).await?;
        let _: Vec<EstimateExportModel> = EstimateExport::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
