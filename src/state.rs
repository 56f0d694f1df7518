use crate::{
    cache::CacheClient,
    config::Config,
    services::{
        chain_registry::ChainRegistry, coingecko::CoinGeckoClient, evm::EvmClient,
        PortfolioService,
    },
    Result,
};
use std::{sync::Arc, time::Duration};

/// Connection pooling HTTP client timeout, individual requests may set a shorter one
const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Shared state handed to every handler, built once before serving
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: CacheClient,
    pub registry: Arc<ChainRegistry>,
    pub coingecko: CoinGeckoClient,
    pub portfolio: PortfolioService,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = CacheClient::new(config.redis_url.as_deref());
        let registry = Arc::new(ChainRegistry::from_config(&config));
        let coingecko = CoinGeckoClient::new(
            http.clone(),
            &config.coingecko_api_url,
            cache.clone(),
            Duration::from_secs(config.markets_cache_ttl_seconds),
            Duration::from_secs(config.coin_detail_cache_ttl_seconds),
        );
        let portfolio =
            PortfolioService::new(registry.clone(), coingecko.clone(), EvmClient::new(http));

        Ok(Self {
            config: Arc::new(config),
            cache,
            registry,
            coingecko,
            portfolio,
        })
    }
}
