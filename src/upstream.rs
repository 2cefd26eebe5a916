//! Upstream market-data providers.
//!
//! Fetchers know nothing about caching. Each call takes explicit parameters, performs one or more
//! requests through a [`Transport`] and returns the normalized JSON payload.
pub mod cmc;
pub mod coingecko;
pub mod transport;

pub use cmc::CoinMarketCap;
pub use coingecko::CoinGecko;
pub use transport::ReqwestTransport;
pub use transport::Transport;
pub use transport::UpstreamRequest;
