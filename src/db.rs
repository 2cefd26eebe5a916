//! Database backend: drivers, entities and schema migrations.
pub mod driver;
pub mod entity;
pub mod migrations;

use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::error::StorageError;
use driver::DatabaseDriver;
use migrations::Migrator;

pub mod prelude {
    pub use super::entity::*;
}

/// Configure the connection and bring the schema up to date.
pub async fn prepare<D: DatabaseDriver + ?Sized>(dbd: &D) -> Result<(), StorageError> {
    dbd.configure().await?;
    Migrator::up(&dbd.connection(), None).await?;
    info!("{} database is ready", dbd.name());
    Ok(())
}
