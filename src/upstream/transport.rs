use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use tracing::instrument;

use crate::error::UpstreamError;

/// A single GET request against a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub url:     String,
    pub query:   Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl UpstreamRequest {
    pub fn new<U: Into<String>>(url: U) -> Self {
        Self {
            url:     url.into(),
            query:   Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn query<K: ToString, V: ToString>(mut self, key: K, value: V) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header<K: ToString, V: ToString>(mut self, key: K, value: V) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// Value of query parameter `key`, if set.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

#[async_trait]
pub trait Transport: Debug + Send + Sync + 'static {
    /// Perform the request and decode a successful response body as JSON. A non-2xx status is an
    /// error.
    async fn get_json(&self, request: UpstreamRequest) -> Result<Value, UpstreamError>;
}

/// HTTP transport over a shared [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(level = "debug", skip(self, request), fields(url = %request.url))]
    async fn get_json(&self, request: UpstreamRequest) -> Result<Value, UpstreamError> {
        let UpstreamRequest { url, query, headers } = request;

        let mut builder = self.client.get(&url).query(&query);
        for (name, value) in &headers {
            builder = builder.header(name, value);
        }

        let transport_err = |source| UpstreamError::Transport {
            url: url.clone(),
            source,
        };

        let response = builder.send().await.map_err(transport_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url:    url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport_err)?;
        debug!("received {} bytes", body.len());
        serde_json::from_slice(&body).map_err(|err| UpstreamError::malformed(&url, err))
    }
}
