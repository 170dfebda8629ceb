use crate::error::{DatabaseError, DatabaseErrorExt};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use tracing::info;

/// Tables, indexes and cascade events. Every definition is idempotent.
const SCHEMA: &str = include_str!("schema.surql");

pub(crate) async fn apply(db: &Surreal<Any>) -> Result<(), DatabaseError> {
    db.query(SCHEMA)
        .await
        .context("Applying schema")?
        .check()
        .map_err(surrealdb::Error::from)
        .context("Applying schema")?;
    info!("Database schema applied");
    Ok(())
}
