use crate::errors::ApiError;
use serde::Deserialize;

/// Configuration for the API server, read from the environment
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Port to run the server on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of tokio worker threads serving requests
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Requests running longer than this are aborted with 408
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL of the CoinGecko v3 API
    #[serde(default = "default_coingecko_api_url")]
    pub coingecko_api_url: String,
    #[serde(default = "default_markets_cache_ttl_seconds")]
    pub markets_cache_ttl_seconds: u64,
    #[serde(default = "default_coin_detail_cache_ttl_seconds")]
    pub coin_detail_cache_ttl_seconds: u64,
    /// Redis URL. Caching stays in process memory when unset
    pub redis_url: Option<String>,
    pub rpc_eth: Option<String>,
    pub rpc_bsc: Option<String>,
    pub rpc_polygon: Option<String>,
    pub rpc_avax: Option<String>,
    pub rpc_arbi: Option<String>,
    pub rpc_opt: Option<String>,
    pub rpc_fantom: Option<String>,
    pub rpc_cronos: Option<String>,
    pub rpc_solana: Option<String>,
    /// Inline chain map, merged on every RPC lookup
    pub chain_config_json: Option<String>,
    /// Chain map file, reloaded whenever its mtime changes
    pub chain_config_path: Option<String>,
    #[serde(default = "default_rate_limit_enabled")]
    pub rate_limit_enabled: bool,
}

fn default_port() -> u16 {
    10000
}

fn default_worker_threads() -> usize {
    8
}

fn default_request_timeout_seconds() -> u64 {
    120
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_coingecko_api_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_markets_cache_ttl_seconds() -> u64 {
    12
}

fn default_coin_detail_cache_ttl_seconds() -> u64 {
    60
}

fn default_rate_limit_enabled() -> bool {
    true
}

impl Config {
    /// Load `.env` (if any) and read the configuration from the process environment
    pub fn from_env() -> Result<Self, ApiError> {
        dotenv::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| ApiError::Config(format!("Failed to load configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        match self.log_format.as_str() {
            "text" | "json" => {}
            other => {
                return Err(ApiError::Config(format!(
                    "LOG_FORMAT must be `text` or `json`, got `{other}`"
                )))
            }
        }
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ApiError::Config(format!(
                "LOG_LEVEL is not a valid level: `{}`",
                self.log_level
            )));
        }
        if self.worker_threads == 0 {
            return Err(ApiError::Config(
                "WORKER_THREADS must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_seconds == 0 {
            return Err(ApiError::Config(
                "REQUEST_TIMEOUT_SECONDS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-chain RPC overrides keyed by chain key
    pub fn rpc_overrides(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("ethereum", self.rpc_eth.as_deref()),
            ("bsc", self.rpc_bsc.as_deref()),
            ("polygon", self.rpc_polygon.as_deref()),
            ("avax", self.rpc_avax.as_deref()),
            ("arbitrum", self.rpc_arbi.as_deref()),
            ("optimism", self.rpc_opt.as_deref()),
            ("fantom", self.rpc_fantom.as_deref()),
            ("cronos", self.rpc_cronos.as_deref()),
            ("solana", self.rpc_solana.as_deref()),
        ]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            worker_threads: default_worker_threads(),
            request_timeout_seconds: default_request_timeout_seconds(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            coingecko_api_url: default_coingecko_api_url(),
            markets_cache_ttl_seconds: default_markets_cache_ttl_seconds(),
            coin_detail_cache_ttl_seconds: default_coin_detail_cache_ttl_seconds(),
            redis_url: None,
            rpc_eth: None,
            rpc_bsc: None,
            rpc_polygon: None,
            rpc_avax: None,
            rpc_arbi: None,
            rpc_opt: None,
            rpc_fantom: None,
            rpc_cronos: None,
            rpc_solana: None,
            chain_config_json: None,
            chain_config_path: None,
            rate_limit_enabled: default_rate_limit_enabled(),
        }
    }
}
