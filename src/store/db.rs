use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tracing::instrument;

use super::CacheEntry;
use super::CacheStore;
use crate::clock::freshness_threshold;
use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::db::entity::api_cache;
use crate::error::StorageError;
use crate::key::CacheKey;

/// Store backed by the `api_cache` table.
pub struct DbStore {
    connection: DatabaseConnection,
    clock:      Arc<dyn Clock>,
}

impl DbStore {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self::with_clock(connection, Arc::new(SystemClock))
    }

    /// Timestamps are taken from `clock` rather than the database server, so reads and writes
    /// always agree on what "now" is.
    pub fn with_clock(connection: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self { connection, clock }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}

impl Debug for DbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbStore").field("clock", &self.clock).finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheStore for DbStore {
    #[instrument(level = "trace", skip(self, key), fields(key = %key))]
    async fn read_fresh(&self, key: &CacheKey, max_age: Duration) -> Result<Option<Value>, StorageError> {
        let threshold = freshness_threshold(self.clock.now(), max_age);
        Ok(api_cache::Entity::find_by_id(key.to_string())
            .filter(api_cache::Column::CachedAt.gt(threshold))
            .one(&self.connection)
            .await?
            .map(|row| row.data))
    }

    #[instrument(level = "trace", skip(self, key, payload), fields(key = %key))]
    async fn upsert(&self, key: &CacheKey, payload: &Value) -> Result<(), StorageError> {
        let row = api_cache::ActiveModel {
            cache_key: Set(key.to_string()),
            data:      Set(payload.clone()),
            cached_at: Set(self.clock.now()),
        };

        api_cache::Entity::insert(row)
            .on_conflict(
                OnConflict::column(api_cache::Column::CacheKey)
                    .update_columns([api_cache::Column::Data, api_cache::Column::CachedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.connection)
            .await?;

        Ok(())
    }

    async fn read_entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StorageError> {
        Ok(api_cache::Entity::find_by_id(key.to_string())
            .one(&self.connection)
            .await?
            .map(|row| CacheEntry {
                key:       row.cache_key,
                payload:   row.data,
                cached_at: row.cached_at,
            }))
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::clock::ManualClock;
    use crate::db;
    use crate::db::driver::sqlite::Sqlite;
    use crate::db::driver::DatabaseDriver;

    async fn sqlite_store(dir: &tempfile::TempDir, clock: &ManualClock) -> DbStore {
        let driver = Sqlite::connect(dir.path(), "cache.db").await.unwrap();
        db::prepare(&driver).await.unwrap();
        DbStore::with_clock(driver.connection(), Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn upsert_keeps_one_row_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::default();
        let store = sqlite_store(&dir, &clock).await;
        let key = CacheKey::plain("markets-100");

        store.upsert(&key, &json!([{"id": "bitcoin"}])).await.unwrap();
        clock.advance(Duration::from_secs(30));
        store.upsert(&key, &json!([{"id": "ethereum"}])).await.unwrap();

        let rows = api_cache::Entity::find().all(store.connection()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].data, json!([{"id": "ethereum"}]));
        assert_eq!(rows[0].cached_at, clock.now());
    }

    #[tokio::test]
    async fn read_fresh_honours_max_age() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::default();
        let store = sqlite_store(&dir, &clock).await;
        let key = CacheKey::plain("globalData");
        let max_age = Duration::from_secs(300);

        assert_eq!(store.read_fresh(&key, max_age).await.unwrap(), None);
        store.upsert(&key, &json!({"data": {"active_cryptocurrencies": 1}})).await.unwrap();

        clock.advance(Duration::from_secs(299));
        assert!(store.read_fresh(&key, max_age).await.unwrap().is_some());

        clock.advance(Duration::from_secs(2));
        assert_eq!(store.read_fresh(&key, max_age).await.unwrap(), None);
        assert!(store.read_entry(&key).await.unwrap().is_some());
    }
}
