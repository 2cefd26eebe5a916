//! # coinmatrix-cache
//!
//! Cache-through data access for third-party crypto market data.
//!
//! Upstream providers (CoinGecko, CoinMarketCap) are rate limited and slow. Every dataset a
//! client asks for goes through one [`Cache`]: if the store holds a copy younger than the
//! configured max-age it is served as is, otherwise the dataset's fetcher runs and the result is
//! written back before being returned.
//!
//! # The Basics
//!
//! - Storage is pluggable through the [`CacheStore`] trait. [`DbStore`] persists entries in the
//!   `api_cache` table via SeaORM (SQLite or PostgreSQL); [`MemoryStore`] keeps them in-process.
//! - A store holds one entry per [`CacheKey`]. Keys are derived from a [`Dataset`] and encode
//!   every parameter, so different parameterizations never collide.
//! - Expiry is logical. Entries are overwritten on refresh and never deleted.
//! - A failed fetch writes nothing and is never masked by older data.
//! - Concurrent misses on one key share a single fetch.
//! - A [`Refresher`] can keep a hot key warm on a timer. It uses the same freshness check as
//!   request traffic, so it never refetches data that is still fresh.
//!
//! ```ignore
//! let cache = Cache::builder()
//!     .store(MemoryStore::new())
//!     .max_age(Duration::from_secs(300))
//!     .build()?;
//!
//! let global = cache
//!     .get_or_refresh(&Dataset::Global.cache_key(), || gecko.global())
//!     .await?;
//! ```
//!
//! On top of the cache sit the request handlers of [`MarketService`] and the identity-scoped
//! user features: bookmarks and sentiment votes behind a JWT [`auth`] gate.

pub mod app;
pub mod auth;
pub mod bookmarks;
pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod key;
pub mod refresher;
pub mod sentiment;
pub mod service;
pub mod session;
pub mod store;
pub mod upstream;

#[doc(inline)]
pub use cache::Cache;
#[doc(inline)]
pub use key::CacheKey;
#[doc(inline)]
pub use key::Dataset;
#[doc(inline)]
pub use refresher::Refresher;
#[doc(inline)]
pub use service::MarketService;
#[doc(inline)]
pub use store::CacheStore;
#[doc(inline)]
pub use store::DbStore;
#[doc(inline)]
pub use store::MemoryStore;

pub mod prelude {
    pub use crate::auth::Authenticator;
    pub use crate::auth::Identity;
    pub use crate::cache::Cache;
    pub use crate::cache::Payload;
    pub use crate::clock::Clock;
    pub use crate::error::*;
    pub use crate::key::*;
    pub use crate::store::CacheEntry;
    pub use crate::store::CacheStore;
    pub use crate::upstream::Transport;
}
