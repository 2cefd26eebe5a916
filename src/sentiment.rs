//! Bullish / bearish votes on coins.
use std::sync::Arc;

use sea_orm::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::DatabaseConnection;
use sea_orm::PaginatorTrait;
use serde::Deserialize;
use serde::Serialize;
use tracing::instrument;

use crate::auth::Identity;
use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::db::entity::sentiment;
use crate::error::ServiceError;
use crate::error::StorageError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentTally {
    pub bullish: u64,
    pub bearish: u64,
}

#[derive(Clone, Debug)]
pub struct Sentiment {
    connection: DatabaseConnection,
    clock:      Arc<dyn Clock>,
}

impl Sentiment {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self::with_clock(connection, Arc::new(SystemClock))
    }

    pub fn with_clock(connection: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self { connection, clock }
    }

    async fn count_votes(&self, coin_id: &str, vote: i16) -> Result<u64, StorageError> {
        Ok(sentiment::Entity::find()
            .filter(sentiment::Column::CoinId.eq(coin_id))
            .filter(sentiment::Column::Vote.eq(vote))
            .count(&self.connection)
            .await?)
    }

    /// Public aggregate for `coin_id`. A coin nobody voted on tallies to zero.
    pub async fn tally(&self, coin_id: &str) -> Result<SentimentTally, ServiceError> {
        Ok(SentimentTally {
            bullish: self.count_votes(coin_id, 1).await?,
            bearish: self.count_votes(coin_id, -1).await?,
        })
    }

    pub async fn my_vote(&self, identity: &Identity, coin_id: &str) -> Result<Option<i16>, ServiceError> {
        Ok(sentiment::Entity::find_by_id((identity.id, coin_id.to_string()))
            .one(&self.connection)
            .await
            .map_err(StorageError::from)?
            .map(|row| row.vote))
    }

    /// Record or replace the vote of `identity`. Only `1` and `-1` are accepted.
    #[instrument(level = "debug", skip(self, identity), fields(user = identity.id))]
    pub async fn vote(&self, identity: &Identity, coin_id: &str, vote: i16) -> Result<(), ServiceError> {
        if coin_id.trim().is_empty() || !matches!(vote, 1 | -1) {
            return Err(ServiceError::bad_request(
                "Valid coinId and vote (-1 or 1) are required",
            ));
        }

        let row = sentiment::ActiveModel {
            user_id:    Set(identity.id),
            coin_id:    Set(coin_id.to_string()),
            vote:       Set(vote),
            created_at: Set(self.clock.now()),
        };
        sentiment::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([sentiment::Column::UserId, sentiment::Column::CoinId])
                    .update_columns([sentiment::Column::Vote, sentiment::Column::CreatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.connection)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::db;
    use crate::db::driver::sqlite::Sqlite;
    use crate::db::driver::DatabaseDriver;

    fn user(id: i32) -> Identity {
        Identity {
            id,
            username: format!("user{id}"),
        }
    }

    #[tokio::test]
    async fn votes_are_tallied_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Sqlite::connect(dir.path(), "sentiment.db").await.unwrap();
        db::prepare(&driver).await.unwrap();
        let clock = ManualClock::default();
        let sentiment = Sentiment::with_clock(driver.connection(), Arc::new(clock.clone()));

        assert_eq!(sentiment.tally("bitcoin").await.unwrap(), SentimentTally::default());
        assert_eq!(sentiment.my_vote(&user(1), "bitcoin").await.unwrap(), None);

        sentiment.vote(&user(1), "bitcoin", 1).await.unwrap();
        sentiment.vote(&user(2), "bitcoin", 1).await.unwrap();
        sentiment.vote(&user(3), "bitcoin", -1).await.unwrap();
        sentiment.vote(&user(3), "ethereum", 1).await.unwrap();
        assert_eq!(
            sentiment.tally("bitcoin").await.unwrap(),
            SentimentTally { bullish: 2, bearish: 1 }
        );

        clock.advance(Duration::from_secs(60));
        sentiment.vote(&user(1), "bitcoin", -1).await.unwrap();
        assert_eq!(sentiment.my_vote(&user(1), "bitcoin").await.unwrap(), Some(-1));
        assert_eq!(
            sentiment.tally("bitcoin").await.unwrap(),
            SentimentTally { bullish: 1, bearish: 2 }
        );

        let row = sentiment::Entity::find_by_id((1, "bitcoin".to_string()))
            .one(&driver.connection())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.created_at, clock.now());
    }

    #[tokio::test]
    async fn invalid_votes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Sqlite::connect(dir.path(), "sentiment.db").await.unwrap();
        db::prepare(&driver).await.unwrap();
        let sentiment = Sentiment::new(driver.connection());

        for vote in [0, 2, -2] {
            assert_eq!(sentiment.vote(&user(1), "bitcoin", vote).await.unwrap_err().status(), 400);
        }
        assert_eq!(sentiment.vote(&user(1), "", 1).await.unwrap_err().status(), 400);
    }
}
