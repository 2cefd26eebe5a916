use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::Transport;
use super::UpstreamRequest;
use crate::error::UpstreamError;
use crate::key::ChartDays;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko public API client.
#[derive(Clone, Debug)]
pub struct CoinGecko {
    transport: Arc<dyn Transport>,
    base_url:  String,
}

impl CoinGecko {
    pub fn new<U: Into<String>>(transport: Arc<dyn Transport>, base_url: U) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { transport, base_url }
    }

    fn request(&self, path: &str) -> UpstreamRequest {
        UpstreamRequest::new(format!("{}{path}", self.base_url))
    }

    /// Top `per_page` coins by market cap, with sparklines and 1h/24h/7d price changes.
    pub async fn markets(&self, per_page: u32) -> Result<Value, UpstreamError> {
        let request = self
            .request("/coins/markets")
            .query("vs_currency", "usd")
            .query("order", "market_cap_desc")
            .query("per_page", per_page)
            .query("page", 1)
            .query("sparkline", true)
            .query("price_change_percentage", "1h,24h,7d");
        let url = request.url.clone();
        expect_array(&url, self.transport.get_json(request).await?)
    }

    /// Market rows for exactly the given coin ids.
    pub async fn markets_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Result<Value, UpstreamError> {
        let ids = ids.iter().map(|id| id.as_ref()).collect::<Vec<_>>().join(",");
        let request = self
            .request("/coins/markets")
            .query("vs_currency", "usd")
            .query("ids", ids);
        let url = request.url.clone();
        expect_array(&url, self.transport.get_json(request).await?)
    }

    pub async fn global(&self) -> Result<Value, UpstreamError> {
        self.transport.get_json(self.request("/global")).await
    }

    /// Trending coins enriched with their market rows.
    pub async fn trending(&self) -> Result<Value, UpstreamError> {
        let request = self.request("/search/trending");
        let url = request.url.clone();
        let trending = self.transport.get_json(request).await?;

        let coins = trending
            .get("coins")
            .and_then(Value::as_array)
            .ok_or_else(|| UpstreamError::malformed(&url, "missing 'coins' array"))?;
        let ids = coins
            .iter()
            .map(|coin| {
                coin.pointer("/item/id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| UpstreamError::malformed(&url, "trending entry without 'item.id'"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if ids.is_empty() {
            debug!("nothing is trending");
            return Ok(Value::Array(Vec::new()));
        }

        self.markets_by_ids(&ids).await
    }

    pub async fn market_chart(&self, coin_id: &str, days: ChartDays) -> Result<Value, UpstreamError> {
        let request = self
            .request(&format!("/coins/{coin_id}/market_chart"))
            .query("vs_currency", "usd")
            .query("days", days);
        self.transport.get_json(request).await
    }

    /// Uncached spot prices.
    pub async fn simple_price(&self, ids: &str, vs_currencies: &str) -> Result<Value, UpstreamError> {
        let request = self
            .request("/simple/price")
            .query("ids", ids)
            .query("vs_currencies", vs_currencies);
        self.transport.get_json(request).await
    }
}

fn expect_array(url: &str, value: Value) -> Result<Value, UpstreamError> {
    if value.is_array() {
        Ok(value)
    }
    else {
        Err(UpstreamError::malformed(url, "expected a JSON array"))
    }
}
