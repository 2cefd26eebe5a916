#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use coinmatrix_cache::clock::ManualClock;
use coinmatrix_cache::error::StorageError;
use coinmatrix_cache::error::UpstreamError;
use coinmatrix_cache::key::CacheKey;
use coinmatrix_cache::store::CacheEntry;
use coinmatrix_cache::store::CacheStore;
use coinmatrix_cache::upstream::Transport;
use coinmatrix_cache::upstream::UpstreamRequest;
use coinmatrix_cache::MemoryStore;
use parking_lot::Mutex;
use serde_json::Value;

#[derive(Debug, Clone)]
enum Route {
    Body(Value),
    Status(u16),
}

/// Canned provider responses keyed by URL path suffix.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes:   Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<UpstreamRequest>>,
    calls:    AtomicUsize,
    delay:    Mutex<Option<Duration>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, suffix: &str, body: Value) -> &Self {
        self.routes.lock().insert(suffix.to_string(), Route::Body(body));
        self
    }

    pub fn fail(&self, suffix: &str, status: u16) -> &Self {
        self.routes.lock().insert(suffix.to_string(), Route::Status(status));
        self
    }

    /// Every response takes this long.
    pub fn with_delay(&self, delay: Duration) -> &Self {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, suffix: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.url.ends_with(suffix)).count()
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_json(&self, request: UpstreamRequest) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let route = self
            .routes
            .lock()
            .iter()
            .find(|(suffix, _)| request.url.ends_with(suffix.as_str()))
            .map(|(_, route)| route.clone());

        match route {
            Some(Route::Body(body)) => Ok(body),
            Some(Route::Status(status)) => Err(UpstreamError::Status {
                url: request.url,
                status,
            }),
            None => Err(UpstreamError::Status {
                url:    request.url,
                status: 404,
            }),
        }
    }
}

/// A store whose backend is down.
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl CacheStore for FailingStore {
    async fn read_fresh(&self, _key: &CacheKey, _max_age: Duration) -> Result<Option<Value>, StorageError> {
        Err(StorageError::Unavailable("connection refused".into()))
    }

    async fn upsert(&self, _key: &CacheKey, _payload: &Value) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("connection refused".into()))
    }

    async fn read_entry(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, StorageError> {
        Err(StorageError::Unavailable("connection refused".into()))
    }
}

/// A [`MemoryStore`] whose freshness reads take a while.
#[derive(Debug)]
pub struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(inner: MemoryStore, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl CacheStore for SlowStore {
    async fn read_fresh(&self, key: &CacheKey, max_age: Duration) -> Result<Option<Value>, StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.read_fresh(key, max_age).await
    }

    async fn upsert(&self, key: &CacheKey, payload: &Value) -> Result<(), StorageError> {
        self.inner.upsert(key, payload).await
    }

    async fn read_entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StorageError> {
        self.inner.read_entry(key).await
    }
}

pub fn manual_clock() -> (ManualClock, Arc<ManualClock>) {
    let clock = ManualClock::default();
    (clock.clone(), Arc::new(clock))
}

pub fn market_rows(ids: &[&str]) -> Value {
    Value::Array(
        ids.iter()
            .enumerate()
            .map(|(rank, id)| serde_json::json!({"id": id, "market_cap_rank": rank + 1}))
            .collect(),
    )
}
