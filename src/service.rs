//! Request handlers.
//!
//! Each handler turns one inbound request into a cache key, a fetcher and an optional
//! post-processing step. The routing layer owns HTTP; it passes raw parameters in and maps
//! [`ServiceError`] back to a status code with [`ServiceError::status()`].
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use fieldx::fxstruct;
use serde_json::Value;
use tracing::instrument;

use crate::cache::Cache;
use crate::error::ServiceError;
use crate::error::UpstreamError;
use crate::key::ChartDays;
use crate::key::Dataset;
use crate::refresher::Refresher;
use crate::store::CacheStore;
use crate::upstream::CoinGecko;
use crate::upstream::CoinMarketCap;

#[fxstruct(sync, no_new, default(off), builder)]
pub struct MarketService<S>
where
    S: CacheStore,
{
    #[fieldx(get(vis(pub), clone))]
    cache: Arc<Cache<S>>,

    gecko: CoinGecko,

    cmc: CoinMarketCap,

    /// Page size of the warm market list.
    #[fieldx(get(vis(pub), copy), default(100))]
    markets_per_page: u32,

    /// How many coins `markets()` returns without `ids` or `per_page`.
    #[fieldx(get(vis(pub), copy), default(50))]
    markets_default_slice: usize,
}

impl<S> MarketService<S>
where
    S: CacheStore,
{
    fn markets_dataset(&self) -> Dataset {
        Dataset::Markets {
            per_page: self.markets_per_page,
        }
    }

    /// The scheduled job keeping the default market list warm. Not started.
    pub fn markets_refresher(&self, period: Duration) -> Refresher<S> {
        let gecko = self.gecko.clone();
        let per_page = self.markets_per_page;
        self.cache.refresher(self.markets_dataset().cache_key(), period, move || {
            let gecko = gecko.clone();
            async move { gecko.markets(per_page).await }
        })
    }

    /// Coins from the warm market list. With `ids` (comma-separated) only those coins are
    /// returned, in market-cap order. Otherwise the first `per_page` coins.
    #[instrument(level = "debug", skip(self))]
    pub async fn markets(&self, ids: Option<&str>, per_page: Option<usize>) -> Result<Value, ServiceError> {
        if per_page == Some(0) {
            return Err(ServiceError::bad_request("per_page must be positive"));
        }

        let per_page_upstream = self.markets_per_page;
        let gecko = &self.gecko;
        let payload = self
            .cache
            .get_or_refresh(&self.markets_dataset().cache_key(), || gecko.markets(per_page_upstream))
            .await
            .map_err(ServiceError::cache("Failed to fetch market data."))?;

        let coins = payload
            .as_array()
            .ok_or_else(|| ServiceError::upstream("Failed to fetch market data.")(not_a_list("markets")))?;

        let wanted = ids
            .map(|ids| {
                ids.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .collect::<HashSet<_>>()
            })
            .filter(|wanted| !wanted.is_empty());

        let selected = match wanted {
            Some(wanted) => coins
                .iter()
                .filter(|coin| coin.get("id").and_then(Value::as_str).is_some_and(|id| wanted.contains(id)))
                .cloned()
                .collect(),
            None => coins
                .iter()
                .take(per_page.unwrap_or(self.markets_default_slice))
                .cloned()
                .collect(),
        };

        Ok(Value::Array(selected))
    }

    pub async fn global(&self) -> Result<Value, ServiceError> {
        let gecko = &self.gecko;
        let payload = self
            .cache
            .get_or_refresh(&Dataset::Global.cache_key(), || gecko.global())
            .await
            .map_err(ServiceError::cache("Failed to fetch global data."))?;
        Ok(Value::clone(&payload))
    }

    pub async fn trending(&self) -> Result<Value, ServiceError> {
        let gecko = &self.gecko;
        let payload = self
            .cache
            .get_or_refresh(&Dataset::Trending.cache_key(), || gecko.trending())
            .await
            .map_err(ServiceError::cache("Failed to fetch trending data."))?;
        Ok(Value::clone(&payload))
    }

    /// Price history of `coin_id` over `days` (a positive number of days or `max`).
    #[instrument(level = "debug", skip(self))]
    pub async fn coin_chart(&self, coin_id: &str, days: Option<&str>) -> Result<Value, ServiceError> {
        let coin_id = coin_id.trim();
        if coin_id.is_empty() {
            return Err(ServiceError::bad_request("Coin id is required."));
        }
        // The id becomes a URL path segment.
        if coin_id.contains(['/', '?', '#', '%']) {
            return Err(ServiceError::bad_request(format!("Invalid coin id '{coin_id}'.")));
        }
        let days = days
            .ok_or_else(|| ServiceError::bad_request("Query parameter 'days' is required."))?
            .parse::<ChartDays>()
            .map_err(ServiceError::bad_request)?;

        let dataset = Dataset::Chart {
            coin_id: coin_id.to_string(),
            days,
        };
        let gecko = &self.gecko;
        let payload = self
            .cache
            .get_or_refresh(&dataset.cache_key(), || gecko.market_chart(coin_id, days))
            .await
            .map_err(ServiceError::cache(format!("Failed to fetch chart data for {coin_id}.")))?;
        Ok(Value::clone(&payload))
    }

    /// CoinMarketCap quote and logo of `symbol`. Symbols are case-insensitive.
    #[instrument(level = "debug", skip(self))]
    pub async fn coin_detail(&self, symbol: &str) -> Result<Value, ServiceError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ServiceError::bad_request("Coin symbol is required."));
        }

        let cmc = &self.cmc;
        let payload = self
            .cache
            .get_or_refresh(&Dataset::coin_detail(&symbol).cache_key(), || cmc.detail(&symbol))
            .await
            .map_err(ServiceError::cache(format!("Failed to fetch data for {symbol}.")))?;
        Ok(Value::clone(&payload))
    }

    /// Spot prices, never cached.
    pub async fn price(&self, ids: Option<&str>, vs_currencies: Option<&str>) -> Result<Value, ServiceError> {
        let (Some(ids), Some(vs_currencies)) = (non_empty(ids), non_empty(vs_currencies))
        else {
            return Err(ServiceError::bad_request("Missing required query parameters"));
        };

        self.gecko
            .simple_price(ids, vs_currencies)
            .await
            .map_err(ServiceError::upstream("Failed to fetch price data"))
    }
}

fn non_empty(param: Option<&str>) -> Option<&str> {
    param.map(str::trim).filter(|p| !p.is_empty())
}

fn not_a_list(dataset: &str) -> UpstreamError {
    UpstreamError::malformed(dataset, "cached payload is not a list")
}
