//! Database drivers.
#[cfg(feature = "pg")]
pub mod pg;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::fmt::Debug;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::error::StorageError;

#[async_trait]
pub trait DatabaseDriver: Debug + Sync + Send + 'static {
    /// Return driver name.
    fn name(&self) -> &'static str;
    fn connection(&self) -> DatabaseConnection;
    /// Apply backend-specific connection settings. Drivers with nothing to tune keep the default.
    async fn configure(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
