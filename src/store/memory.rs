use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::CacheEntry;
use super::CacheStore;
use crate::clock::freshness_threshold;
use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::error::StorageError;
use crate::key::CacheKey;

/// Process-local store. Useful for tests and for running without a database; entries do not
/// survive a restart.
#[derive(Debug)]
pub struct MemoryStore {
    clock:   Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn read_fresh(&self, key: &CacheKey, max_age: Duration) -> Result<Option<Value>, StorageError> {
        let threshold = freshness_threshold(self.clock.now(), max_age);
        Ok(self
            .entries
            .read()
            .get(key.as_str())
            .filter(|entry| entry.cached_at > threshold)
            .map(|entry| entry.payload.clone()))
    }

    async fn upsert(&self, key: &CacheKey, payload: &Value) -> Result<(), StorageError> {
        let entry = CacheEntry {
            key:       key.to_string(),
            payload:   payload.clone(),
            cached_at: self.clock.now(),
        };
        self.entries.write().insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn read_entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StorageError> {
        Ok(self.entries.read().get(key.as_str()).cloned())
    }
}
