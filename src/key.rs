//! Cache key derivation.
//!
//! Unparameterized datasets are stored under a plain name. Parameterized ones use
//! `"<dataset>-<param1>-<param2>..."`. These strings are what ends up in the `cache_key`
//! column, so they must stay stable across releases.
use std::fmt::Display;
use std::str::FromStr;

/// Storage key of one dataset and parameter combination.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn plain<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn with_params<I, P>(name: &str, params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Display,
    {
        let mut key = name.to_string();
        for param in params {
            key.push('-');
            key.push_str(&param.to_string());
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Dataset> for CacheKey {
    fn from(dataset: Dataset) -> Self {
        dataset.cache_key()
    }
}

/// The `days` range of a market chart. Never contains a `-`, which keeps chart keys unambiguous
/// even for coin ids that do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChartDays {
    Days(u32),
    Max,
}

impl Display for ChartDays {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Days(days) => write!(f, "{days}"),
            Self::Max => f.write_str("max"),
        }
    }
}

impl FromStr for ChartDays {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("max") {
            return Ok(Self::Max);
        }
        match s.parse::<u32>() {
            Ok(days) if days > 0 => Ok(Self::Days(days)),
            _ => Err(format!("invalid chart range '{s}': expected a positive number of days or 'max'")),
        }
    }
}

/// A coin ticker symbol, uppercased on construction. Symbols are case-insensitive upstream, so
/// `"eth"` and `"ETH"` are the same symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: &str) -> Self {
        Self(symbol.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every externally-sourced dataset the cache knows how to key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// Top coins by market cap, one page.
    Markets { per_page: u32 },
    Global,
    Trending,
    Chart { coin_id: String, days: ChartDays },
    /// Composite CoinMarketCap metadata + quote.
    CoinDetail { symbol: Symbol },
}

impl Dataset {
    pub fn coin_detail(symbol: &str) -> Self {
        Self::CoinDetail {
            symbol: Symbol::new(symbol),
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        match self {
            Self::Markets { per_page } => CacheKey::with_params("markets", [per_page]),
            Self::Global => CacheKey::plain("globalData"),
            Self::Trending => CacheKey::plain("trendingData"),
            Self::Chart { coin_id, days } => {
                CacheKey::with_params("cg-chart", [coin_id.to_string(), days.to_string()])
            }
            Self::CoinDetail { symbol } => CacheKey::with_params("cmc-detail", [symbol]),
        }
    }
}
