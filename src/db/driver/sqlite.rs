use std::ops::Deref;
use std::path::Path;

use async_trait::async_trait;
use fieldx::fxstruct;
use sea_orm::ConnectionTrait;
use sea_orm::DatabaseConnection;
use tracing::error;

use super::DatabaseDriver;
use crate::error::StorageError;

#[derive(Debug)]
#[fxstruct(sync, no_new)]
pub struct Sqlite {
    connection: DatabaseConnection,
}

impl Sqlite {
    /// Open (creating if necessary) the database file `db_name` in `db_dir`.
    pub async fn connect(db_dir: &Path, db_name: &str) -> Result<Self, StorageError> {
        let db_path = db_dir.join(db_name);

        let schema = format!("sqlite://{}?mode=rwc", db_path.display());
        let db = sea_orm::Database::connect(&schema)
            .await
            .inspect_err(|e| error!("Error connecting to database {schema}: {e}"))?;

        Ok(Self { connection: db })
    }
}

#[async_trait]
impl DatabaseDriver for Sqlite {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    async fn configure(&self) -> Result<(), StorageError> {
        let db = &self.connection;

        db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        db.execute_unprepared("PRAGMA synchronous=NORMAL;").await?;
        // Scheduler and request upserts may collide on the same row.
        db.execute_unprepared("PRAGMA busy_timeout=5000;").await?;

        Ok(())
    }
}

impl Deref for Sqlite {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl AsRef<DatabaseConnection> for Sqlite {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.connection
    }
}
