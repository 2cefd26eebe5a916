use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use fieldx_plus::child_build;
use fieldx_plus::fx_plus;
use moka::future::Cache as InFlight;
use moka::Expiry;
use serde_json::Value;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use crate::error::CacheError;
use crate::error::UpstreamError;
use crate::key::CacheKey;
use crate::refresher::Refresher;
use crate::store::CacheStore;

/// Immutable snapshot of a dataset as handed out to callers.
pub type Payload = Arc<Value>;

// Callers only share a flight when they asked for the same freshness window.
type FlightKey = (CacheKey, Duration);

// An in-flight entry never outlives the window it was loaded for.
struct FlightWindow;

impl Expiry<FlightKey, Payload> for FlightWindow {
    fn expire_after_create(&self, key: &FlightKey, _value: &Payload, _created_at: Instant) -> Option<Duration> {
        Some(key.1)
    }
}

/// The cache-through orchestrator. Every dataset goes through
/// [`get_or_refresh()`](Cache::get_or_refresh), so they all share one freshness policy.
///
/// ```ignore
/// let cache = Cache::builder()
///     .store(DbStore::new(connection))
///     .max_age(Duration::from_secs(300))
///     .build()?;
///
/// let markets = cache
///     .get_or_refresh(&Dataset::Markets { per_page: 100 }.cache_key(), || async {
///         gecko.markets(100).await
///     })
///     .await?;
/// ```
///
/// Concurrent callers missing on the same key with the same max-age share one fetch: the first
/// one reads the store, fetches and writes back while the others wait for its outcome, success
/// or failure. A caller with a different max-age does its own store read.
#[fx_plus(
    parent,
    no_new,
    default(off),
    sync,
    builder(
        doc("Builder object of [`Cache`].", "", "See [`Cache::builder()`] method."),
        method_doc("Implement builder pattern for [`Cache`]."),
    )
)]
pub struct Cache<S>
where
    S: CacheStore,
{
    #[fieldx(builder(vis(pub), required, into), get(vis(pub), clone))]
    store: Arc<S>,

    /// How old a stored entry may be and still be served.
    #[fieldx(get(vis(pub), copy), default(Duration::from_secs(300)))]
    max_age: Duration,

    // Single-flight registry. An entry exists only while its fetch is running.
    #[fieldx(private, lazy, get(clone), builder(off))]
    in_flight: Arc<InFlight<FlightKey, Payload>>,
}

impl<S> Cache<S>
where
    S: CacheStore,
{
    fn build_in_flight(&self) -> Arc<InFlight<FlightKey, Payload>> {
        Arc::new(
            InFlight::builder()
                .name("in-flight fetches")
                // Backstop only; completed fetches are invalidated right away.
                .expire_after(FlightWindow)
                .build(),
        )
    }

    /// Serve `key` from the store if it is younger than the configured max-age, otherwise run
    /// `fetcher` and persist its result.
    pub async fn get_or_refresh<F, Fut>(&self, key: &CacheKey, fetcher: F) -> Result<Payload, Arc<CacheError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, UpstreamError>>,
    {
        self.get_or_refresh_within(key, self.max_age(), fetcher).await
    }

    /// Same as [`get_or_refresh()`](Self::get_or_refresh) with an explicit max-age.
    #[instrument(level = "debug", skip(self, key, fetcher), fields(key = %key))]
    pub async fn get_or_refresh_within<F, Fut>(
        &self,
        key: &CacheKey,
        max_age: Duration,
        fetcher: F,
    ) -> Result<Payload, Arc<CacheError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, UpstreamError>>,
    {
        let in_flight = self.in_flight();
        let flight = (key.clone(), max_age);
        let entry = in_flight
            .entry(flight.clone())
            .or_try_insert_with(self.load_or_fetch(key, max_age, fetcher))
            .await?;

        if entry.is_fresh() {
            // We ran the fetch; let the next caller go back to the store.
            in_flight.invalidate(&flight).await;
        }
        else {
            debug!("joined an in-flight refresh");
        }

        Ok(entry.into_value())
    }

    async fn load_or_fetch<F, Fut>(&self, key: &CacheKey, max_age: Duration, fetcher: F) -> Result<Payload, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, UpstreamError>>,
    {
        let store = self.store();

        if let Some(payload) = store.read_fresh(key, max_age).await? {
            debug!("HIT");
            return Ok(Arc::new(payload));
        }

        debug!("MISS, fetching");
        // A failed fetch must leave the stored entry untouched.
        let payload = fetcher().await.inspect_err(|err| warn!("fetch for '{key}' failed: {err}"))?;
        store.upsert(key, &payload).await?;

        Ok(Arc::new(payload))
    }

    /// Create a scheduled refresh job for `key`. The job is not running until
    /// [`Refresher::start()`] is called.
    pub fn refresher<F, Fut>(&self, key: CacheKey, period: Duration, fetcher: F) -> Refresher<S>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, UpstreamError>> + Send + 'static,
    {
        let fetcher: crate::refresher::BoxedFetcher = Arc::new(move || Box::pin(fetcher()));
        child_build!(
            self,
            Refresher<S> {
                key: key,
                period: period,
                fetcher: fetcher,
            }
        )
        .expect("Refresher has no optional fields left unset")
    }
}
