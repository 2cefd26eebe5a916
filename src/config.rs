//! Command line / environment configuration.
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

use fieldx::fxstruct;
use garde::Validate;

use crate::upstream::cmc;
use crate::upstream::coingecko;

#[derive(Debug, Clone, clap::Parser, Validate)]
#[fxstruct(no_new, get(copy))]
#[clap(about, version, author, name = "coinmatrix")]
pub struct Config {
    /// Seconds a cached dataset is served before it is refetched.
    #[clap(long, env = "COINMATRIX_CACHE_LIFETIME", default_value_t = 300)]
    #[fieldx(get(off))]
    #[garde(range(min = 1))]
    cache_lifetime: u64,

    /// Seconds between scheduled refreshes of the default market list.
    #[clap(long, env = "COINMATRIX_REFRESH_INTERVAL", default_value_t = 300)]
    #[fieldx(get(off))]
    #[garde(range(min = 1))]
    refresh_interval: u64,

    /// Page size of the market list kept warm by the scheduler.
    #[clap(long, env = "COINMATRIX_MARKETS_PER_PAGE", default_value_t = 100)]
    #[garde(range(min = 1, max = 250))]
    markets_per_page: u32,

    /// Number of coins returned by the market list when no filter is given.
    #[clap(long, env = "COINMATRIX_MARKETS_DEFAULT_SLICE", default_value_t = 50)]
    #[garde(range(min = 1), custom(Self::not_above("markets-per-page", &self.markets_per_page)))]
    markets_default_slice: u32,

    #[clap(long, env = "COINMATRIX_COINGECKO_URL", default_value = coingecko::DEFAULT_BASE_URL)]
    #[fieldx(get(clone))]
    #[garde(url)]
    coingecko_url: String,

    #[clap(long, env = "COINMATRIX_CMC_URL", default_value = cmc::DEFAULT_BASE_URL)]
    #[fieldx(get(clone))]
    #[garde(url)]
    cmc_url: String,

    /// CoinMarketCap pro API key.
    #[clap(long, env = "COINMATRIX_CMC_API_KEY", hide_env_values = true)]
    #[fieldx(get(clone))]
    #[garde(length(min = 1))]
    cmc_api_key: String,

    /// HS256 secret bearer tokens are signed with.
    #[clap(long, env = "COINMATRIX_JWT_SECRET", hide_env_values = true)]
    #[fieldx(get(clone))]
    #[garde(length(min = 1))]
    jwt_secret: String,

    /// Upstream request timeout in seconds.
    #[clap(long, env = "COINMATRIX_REQUEST_TIMEOUT", default_value_t = 10)]
    #[fieldx(get(off))]
    #[garde(range(min = 1))]
    request_timeout: u64,

    /// Use SQLite.
    #[clap(long, env = "COINMATRIX_SQLITE", default_value_t = false)]
    #[garde(custom(Self::feature(cfg!(feature = "sqlite"), "sqlite")))]
    sqlite: bool,

    /// Path to the SQLite database file.
    #[clap(long, env = "COINMATRIX_SQLITE_PATH", default_value = "coinmatrix.db")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    sqlite_path: PathBuf,

    /// Use PostgreSQL.
    #[clap(long, env = "COINMATRIX_PG", default_value_t = false)]
    #[garde(
        custom(Self::feature(cfg!(feature = "pg"), "pg")),
        custom(Self::exactly_one_backend(&self.sqlite))
    )]
    pg: bool,

    #[clap(long, env = "COINMATRIX_PG_HOST", default_value = "localhost")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_host: String,

    #[clap(long, env = "COINMATRIX_PG_PORT", default_value_t = 5432)]
    #[garde(skip)]
    pg_port: u16,

    #[clap(long, env = "COINMATRIX_PG_USER", default_value = "coinmatrix")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_user: String,

    #[clap(long, env = "COINMATRIX_PG_PASSWORD", hide_env_values = true, default_value = "coinmatrix")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_password: String,

    #[clap(long, env = "COINMATRIX_PG_DATABASE", default_value = "coinmatrix")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_database: String,

    /// Write logs to this file instead of stdout.
    #[clap(long, env = "COINMATRIX_LOG_FILE")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    log_file: Option<PathBuf>,
}

impl Config {
    pub fn cache_lifetime(&self) -> Duration {
        Duration::from_secs(self.cache_lifetime)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    fn not_above<'a, T: PartialOrd + Display>(
        max_name: &'static str,
        max: &'a T,
    ) -> impl FnOnce(&'a T, &()) -> garde::Result {
        move |value, _| {
            if value > max {
                Err(garde::Error::new(format!("{value} is more than {max_name} ({max})")))
            }
            else {
                Ok(())
            }
        }
    }

    fn feature<'a>(feature_enabled: bool, feature: &'static str) -> impl FnOnce(&'a bool, &()) -> garde::Result {
        move |value, _| {
            if !*value || feature_enabled {
                Ok(())
            }
            else {
                Err(garde::Error::new(format!("Build feature '{feature}' must be enabled.")))
            }
        }
    }

    fn exactly_one_backend<'a>(sqlite: &'a bool) -> impl FnOnce(&'a bool, &()) -> garde::Result {
        move |pg, _| {
            if *pg != *sqlite {
                Ok(())
            }
            else {
                Err(garde::Error::new("Exactly one of --sqlite or --pg must be given."))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["coinmatrix", "--cmc-api-key", "k", "--jwt-secret", "s"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let config = parse(&["--sqlite"]);
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_lifetime(), Duration::from_secs(300));
        assert_eq!(config.refresh_interval(), Duration::from_secs(300));
        assert_eq!(config.markets_per_page(), 100);
        assert_eq!(config.markets_default_slice(), 50);
        assert_eq!(config.coingecko_url(), coingecko::DEFAULT_BASE_URL);
    }

    #[test]
    fn backend_must_be_chosen_once() {
        assert!(parse(&[]).validate().is_err());
        assert!(parse(&["--sqlite", "--pg"]).validate().is_err());
    }

    #[test]
    fn slice_cannot_exceed_page() {
        assert!(parse(&["--sqlite", "--markets-default-slice", "150"]).validate().is_err());
    }
}
