//! Scheduled refresh of a single hot key.
//!
//! The refresher calls [`Cache::get_or_refresh()`] on a fixed period, so it goes through the same
//! freshness check as request traffic. If a request already refreshed the key within the window,
//! the tick is a store hit and nothing is fetched. Failures are logged and the next tick retries.
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use fieldx_plus::fx_plus;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::error;
use tracing::info;

use crate::cache::Cache;
use crate::error::UpstreamError;
use crate::key::CacheKey;
use crate::store::CacheStore;

pub type FetchFuture = Pin<Box<dyn Future<Output = Result<Value, UpstreamError>> + Send>>;
pub type BoxedFetcher = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

/// Created with [`Cache::refresher()`].
#[fx_plus(child(Cache<S>, rc_strong), sync, default(off))]
pub struct Refresher<S>
where
    S: CacheStore,
{
    #[fieldx(get(vis(pub)))]
    key: CacheKey,

    #[fieldx(get(vis(pub), copy))]
    period: Duration,

    fetcher: BoxedFetcher,

    #[fieldx(private, clearer, lock, get, set, builder(off))]
    task: JoinHandle<()>,
}

impl<S> Refresher<S>
where
    S: CacheStore,
{
    /// Spawn the refresh loop. The first refresh happens immediately. Calling it on a running
    /// refresher does nothing.
    pub fn start(&self) {
        if self.is_running() {
            return;
        }

        let cache = self.parent();
        let key = self.key.clone();
        let period = self.period;
        let fetcher = Arc::clone(&self.fetcher);

        info!("Scheduling refresh of '{key}' every {}s", period.as_secs());
        self.set_task(tokio::spawn(async move { Self::refresh_loop(cache, key, period, fetcher).await }));
    }

    pub fn is_running(&self) -> bool {
        self.task().as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the refresh loop and wait for it to wind down.
    pub async fn stop(&self) {
        if let Some(task) = self.clear_task() {
            task.abort();
            let _ = task.await;
            info!("Stopped refresh of '{}'", self.key);
        }
    }

    async fn refresh_loop(cache: Arc<Cache<S>>, key: CacheKey, period: Duration, fetcher: BoxedFetcher) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            info!("Running scheduled refresh of '{key}'");
            match cache.get_or_refresh(&key, || fetcher()).await {
                Ok(_) => info!("'{key}' is up to date"),
                Err(err) => error!("Scheduled refresh of '{key}' failed: {err}"),
            }
        }
    }
}

impl<S> Drop for Refresher<S>
where
    S: CacheStore,
{
    fn drop(&mut self) {
        if let Some(task) = self.clear_task() {
            task.abort();
        }
    }
}
