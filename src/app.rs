//! Process assembly: configuration, database, cache, scheduler.
#[cfg(feature = "sqlite")]
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::CommandFactory;
use clap::Parser;
use garde::Validate;
use sea_orm::DatabaseConnection;
use tracing::info;
use tracing::warn;

use crate::auth::JwtAuthenticator;
use crate::bookmarks::Bookmarks;
use crate::cache::Cache;
use crate::config::Config;
use crate::db;
use crate::db::driver::DatabaseDriver;
use crate::sentiment::Sentiment;
use crate::service::MarketService;
use crate::store::DbStore;
use crate::upstream::CoinGecko;
use crate::upstream::CoinMarketCap;
use crate::upstream::ReqwestTransport;
use crate::upstream::Transport;

/// Everything a routing layer needs to serve requests.
pub struct Services {
    pub market:        MarketService<DbStore>,
    pub bookmarks:     Bookmarks,
    pub sentiment:     Sentiment,
    pub authenticator: JwtAuthenticator,
}

#[derive(Debug)]
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Parse the command line and environment. Invalid input terminates the process with a usage
    /// message.
    pub fn from_args() -> Self {
        let config = Config::parse();
        if let Err(err) = config.validate() {
            Config::command().error(ErrorKind::InvalidValue, err).exit();
        }
        Self::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[cfg(feature = "tracing")]
    pub fn setup_tracing(&self) -> anyhow::Result<()> {
        use std::io;
        use std::sync::Mutex;

        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        let writer = Mutex::new(if let Some(log_file) = self.config.log_file() {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file)
                .with_context(|| format!("opening log file {}", log_file.display()))?;
            Box::new(file) as Box<dyn io::Write + Send>
        }
        else {
            Box::new(io::stdout()) as Box<dyn io::Write + Send>
        });

        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .try_init()?;

        info!("Tracing initialized");
        Ok(())
    }

    async fn connect(&self) -> anyhow::Result<DatabaseConnection> {
        if self.config.sqlite() {
            self.connect_sqlite().await
        }
        else if self.config.pg() {
            self.connect_pg().await
        }
        else {
            anyhow::bail!("no database backend selected")
        }
    }

    #[cfg(feature = "sqlite")]
    async fn connect_sqlite(&self) -> anyhow::Result<DatabaseConnection> {
        let path = self.config.sqlite_path();
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("invalid SQLite path {}", path.display()))?;
        let driver = db::driver::sqlite::Sqlite::connect(dir, name).await?;
        Self::prepared(&driver).await
    }

    #[cfg(not(feature = "sqlite"))]
    async fn connect_sqlite(&self) -> anyhow::Result<DatabaseConnection> {
        anyhow::bail!("built without the 'sqlite' feature")
    }

    #[cfg(feature = "pg")]
    async fn connect_pg(&self) -> anyhow::Result<DatabaseConnection> {
        let config = &self.config;
        let driver = db::driver::pg::Pg::builder()
            .host(config.pg_host())
            .port(config.pg_port())
            .user(config.pg_user())
            .password(config.pg_password())
            .database(config.pg_database())
            .build()?;
        driver.connect().await?;
        Self::prepared(&*driver).await
    }

    #[cfg(not(feature = "pg"))]
    async fn connect_pg(&self) -> anyhow::Result<DatabaseConnection> {
        anyhow::bail!("built without the 'pg' feature")
    }

    async fn prepared<D: DatabaseDriver>(driver: &D) -> anyhow::Result<DatabaseConnection> {
        db::prepare(driver).await?;
        Ok(driver.connection())
    }

    /// Connect to the database and wire up all services. The market refresher is not started.
    pub async fn services(&self) -> anyhow::Result<Services> {
        let config = &self.config;
        let connection = self.connect().await?;

        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config.request_timeout())?);
        let cache = Cache::builder()
            .store(DbStore::new(connection.clone()))
            .max_age(config.cache_lifetime())
            .build()?;

        let market = MarketService::builder()
            .cache(cache)
            .gecko(CoinGecko::new(transport.clone(), config.coingecko_url()))
            .cmc(CoinMarketCap::new(transport, config.cmc_url(), config.cmc_api_key()))
            .markets_per_page(config.markets_per_page())
            .markets_default_slice(config.markets_default_slice() as usize)
            .build()?;

        Ok(Services {
            market,
            bookmarks: Bookmarks::new(connection.clone()),
            sentiment: Sentiment::new(connection),
            authenticator: JwtAuthenticator::new(&config.jwt_secret()),
        })
    }

    /// Keep the market list warm until Ctrl-C.
    pub async fn run(&self) -> anyhow::Result<()> {
        let services = self.services().await?;

        let refresher = services.market.markets_refresher(self.config.refresh_interval());
        refresher.start();

        info!("Serving; press Ctrl-C to stop");
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {err}");
        }

        refresher.stop().await;
        info!("Shut down");
        Ok(())
    }
}
