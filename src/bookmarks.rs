//! Per-user coin bookmarks.
use sea_orm::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::DatabaseConnection;
use sea_orm::QueryOrder;
use tracing::debug;
use tracing::instrument;

use crate::auth::Identity;
use crate::db::entity::bookmark;
use crate::error::ServiceError;
use crate::error::StorageError;

#[derive(Clone, Debug)]
pub struct Bookmarks {
    connection: DatabaseConnection,
}

impl Bookmarks {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    /// Bookmarked coin ids of `identity`, in id order.
    pub async fn list(&self, identity: &Identity) -> Result<Vec<String>, ServiceError> {
        Ok(bookmark::Entity::find()
            .filter(bookmark::Column::UserId.eq(identity.id))
            .order_by_asc(bookmark::Column::CoinId)
            .all(&self.connection)
            .await
            .map_err(StorageError::from)?
            .into_iter()
            .map(|row| row.coin_id)
            .collect())
    }

    /// Adding an existing bookmark is a no-op.
    #[instrument(level = "debug", skip(self, identity), fields(user = identity.id))]
    pub async fn add(&self, identity: &Identity, coin_id: &str) -> Result<(), ServiceError> {
        if coin_id.trim().is_empty() {
            return Err(ServiceError::bad_request("coinId is required"));
        }

        let row = bookmark::ActiveModel {
            user_id: Set(identity.id),
            coin_id: Set(coin_id.to_string()),
        };
        let inserted = bookmark::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([bookmark::Column::UserId, bookmark::Column::CoinId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.connection)
            .await
            .map_err(StorageError::from)?;

        if inserted == 0 {
            debug!("already bookmarked");
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self, identity), fields(user = identity.id))]
    pub async fn remove(&self, identity: &Identity, coin_id: &str) -> Result<(), ServiceError> {
        let deleted = bookmark::Entity::delete_many()
            .filter(bookmark::Column::UserId.eq(identity.id))
            .filter(bookmark::Column::CoinId.eq(coin_id))
            .exec(&self.connection)
            .await
            .map_err(StorageError::from)?;

        if deleted.rows_affected == 0 {
            return Err(ServiceError::not_found("Bookmark not found."));
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::driver::sqlite::Sqlite;
    use crate::db::driver::DatabaseDriver;

    async fn bookmarks(dir: &tempfile::TempDir) -> Bookmarks {
        let driver = Sqlite::connect(dir.path(), "bookmarks.db").await.unwrap();
        db::prepare(&driver).await.unwrap();
        Bookmarks::new(driver.connection())
    }

    fn user(id: i32) -> Identity {
        Identity {
            id,
            username: format!("user{id}"),
        }
    }

    #[tokio::test]
    async fn add_is_idempotent_and_scoped_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let bookmarks = bookmarks(&dir).await;

        bookmarks.add(&user(1), "solana").await.unwrap();
        bookmarks.add(&user(1), "bitcoin").await.unwrap();
        bookmarks.add(&user(1), "bitcoin").await.unwrap();
        bookmarks.add(&user(2), "ethereum").await.unwrap();

        assert_eq!(bookmarks.list(&user(1)).await.unwrap(), vec!["bitcoin", "solana"]);
        assert_eq!(bookmarks.list(&user(2)).await.unwrap(), vec!["ethereum"]);
    }

    #[tokio::test]
    async fn empty_coin_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bookmarks = bookmarks(&dir).await;

        let err = bookmarks.add(&user(1), "").await.unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn removing_missing_bookmark_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let bookmarks = bookmarks(&dir).await;

        bookmarks.add(&user(1), "bitcoin").await.unwrap();
        bookmarks.remove(&user(1), "bitcoin").await.unwrap();

        let err = bookmarks.remove(&user(1), "bitcoin").await.unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(err.user_message(), "Bookmark not found.");
    }
}
