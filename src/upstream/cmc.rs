use std::sync::Arc;

use serde_json::Value;

use super::Transport;
use super::UpstreamRequest;
use crate::error::UpstreamError;

pub const DEFAULT_BASE_URL: &str = "https://pro-api.coinmarketcap.com/v2/cryptocurrency";
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// CoinMarketCap pro API client.
#[derive(Clone)]
pub struct CoinMarketCap {
    transport: Arc<dyn Transport>,
    base_url:  String,
    api_key:   String,
}

impl std::fmt::Debug for CoinMarketCap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinMarketCap")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CoinMarketCap {
    pub fn new<U: Into<String>, K: Into<String>>(transport: Arc<dyn Transport>, base_url: U, api_key: K) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn request(&self, path: &str, symbol: &str) -> UpstreamRequest {
        UpstreamRequest::new(format!("{}{path}", self.base_url))
            .query("symbol", symbol)
            .header(API_KEY_HEADER, &self.api_key)
    }

    /// Latest USD quote of `symbol` merged with its logo from the metadata endpoint. Both
    /// requests run concurrently and both must succeed.
    pub async fn detail(&self, symbol: &str) -> Result<Value, UpstreamError> {
        let symbol = symbol.to_uppercase();
        let info_req = self.request("/info", &symbol);
        let quote_req = self.request("/quotes/latest", &symbol);
        let info_url = info_req.url.clone();
        let quote_url = quote_req.url.clone();

        let (info, quotes) = tokio::try_join!(self.transport.get_json(info_req), self.transport.get_json(quote_req))?;

        let coin_info = first_for_symbol(&info_url, &info, &symbol)?;
        let mut coin = first_for_symbol(&quote_url, &quotes, &symbol)?.clone();

        let logo = coin_info.get("logo").cloned().unwrap_or(Value::Null);
        let usd = coin
            .pointer("/quote/USD")
            .cloned()
            .ok_or_else(|| UpstreamError::malformed(&quote_url, format!("no USD quote for {symbol}")))?;

        let fields = coin
            .as_object_mut()
            .ok_or_else(|| UpstreamError::malformed(&quote_url, format!("quote for {symbol} is not an object")))?;
        fields.insert("logo".into(), logo);
        fields.insert("quote".into(), usd);

        Ok(coin)
    }
}

// Both endpoints answer with `{"data": {"<SYMBOL>": [ ... ]}}`.
fn first_for_symbol<'a>(url: &str, body: &'a Value, symbol: &str) -> Result<&'a Value, UpstreamError> {
    body.get("data")
        .and_then(|data| data.get(symbol))
        .and_then(|entries| entries.get(0))
        .ok_or_else(|| UpstreamError::malformed(url, format!("no data for symbol {symbol}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::upstream::transport::mock::MockTransport;

    fn cmc() -> (CoinMarketCap, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::default());
        (CoinMarketCap::new(transport.clone(), "https://cmc.test/v2/cryptocurrency", "secret"), transport)
    }

    #[tokio::test]
    async fn detail_merges_logo_and_usd_quote() {
        let (cmc, transport) = cmc();
        transport
            .respond("/info", json!({"data": {"BTC": [{"logo": "https://img.test/btc.png"}]}}))
            .respond(
                "/quotes/latest",
                json!({"data": {"BTC": [{"id": 1, "symbol": "BTC", "quote": {"USD": {"price": 65000.0}}}]}}),
            );

        let detail = cmc.detail("btc").await.unwrap();
        assert_eq!(
            detail,
            json!({"id": 1, "symbol": "BTC", "logo": "https://img.test/btc.png", "quote": {"price": 65000.0}})
        );

        for request in transport.requests() {
            assert_eq!(request.query_param("symbol"), Some("BTC"));
            assert!(request.headers.contains(&(API_KEY_HEADER.to_string(), "secret".to_string())));
        }
    }

    #[tokio::test]
    async fn failing_half_fails_the_detail() {
        let (cmc, transport) = cmc();
        transport
            .respond("/info", json!({"data": {"BTC": [{"logo": "x"}]}}))
            .fail("/quotes/latest", 500);

        assert!(matches!(cmc.detail("BTC").await, Err(UpstreamError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn unknown_symbol_is_malformed() {
        let (cmc, transport) = cmc();
        transport
            .respond("/info", json!({"data": {}}))
            .respond("/quotes/latest", json!({"data": {}}));

        assert!(matches!(cmc.detail("NOPE").await, Err(UpstreamError::Malformed { .. })));
    }
}
