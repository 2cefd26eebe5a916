//! Persistent key-value storage behind the cache.
//!
//! A store holds at most one [`CacheEntry`] per key. Age evaluation happens inside
//! [`CacheStore::read_fresh()`], so a store never hands out an entry older than the requested
//! max-age. Expiry is purely logical: entries are overwritten, never deleted.
pub mod db;
pub mod memory;

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::StorageError;
use crate::key::CacheKey;

pub use db::DbStore;
pub use memory::MemoryStore;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key:       String,
    pub payload:   Value,
    pub cached_at: DateTime<Utc>,
}

#[async_trait]
pub trait CacheStore: Debug + Send + Sync + 'static {
    /// Payload stored under `key` if it was written less than `max_age` ago.
    async fn read_fresh(&self, key: &CacheKey, max_age: Duration) -> Result<Option<Value>, StorageError>;

    /// Insert or replace the entry for `key`, stamping it with the current time. Concurrent
    /// upserts of the same key resolve last-writer-wins.
    async fn upsert(&self, key: &CacheKey, payload: &Value) -> Result<(), StorageError>;

    /// The raw entry regardless of its age.
    async fn read_entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StorageError>;
}
