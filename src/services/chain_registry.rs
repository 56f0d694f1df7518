//! Chain key to RPC URL registry.
//!
//! Defaults can be overridden per chain from the environment, extended with
//! an inline JSON map and with a YAML or JSON file that is re-read whenever
//! its modification time changes.

use crate::{config::Config, validation::validate_http_url};
use serde_json::Value;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Chain key used for Solana, every other key is treated as an EVM chain
pub const SOLANA_CHAIN: &str = "solana";

/// Files picked up from the working directory, in order, when no path is configured
pub const DEFAULT_CHAIN_CONFIG_FILES: &[&str] = &["chains.yaml", "chains.json"];

pub const DEFAULT_RPC_URLS: &[(&str, &str)] = &[
    ("ethereum", "https://cloudflare-eth.com"),
    ("bsc", "https://bsc-dataseed.binance.org/"),
    ("polygon", "https://rpc.ankr.com/polygon"),
    ("avax", "https://rpc.ankr.com/avalanche"),
    ("arbitrum", "https://rpc.ankr.com/arbitrum"),
    ("optimism", "https://rpc.ankr.com/optimism"),
    ("fantom", "https://rpc.ankr.com/fantom"),
    ("cronos", "https://evm.cronos.org"),
    (SOLANA_CHAIN, "https://api.mainnet-beta.solana.com"),
];

/// CoinGecko platform key to chain key
pub const PLATFORM_TO_CHAIN: &[(&str, &str)] = &[
    ("ethereum", "ethereum"),
    ("binance-smart-chain", "bsc"),
    ("polygon-pos", "polygon"),
    ("avalanche", "avax"),
    ("arbitrum-one", "arbitrum"),
    ("optimistic-ethereum", "optimism"),
    ("fantom", "fantom"),
    ("solana", SOLANA_CHAIN),
];

/// CoinGecko id of a chain's native coin to chain key
pub const NATIVE_COIN_TO_CHAIN: &[(&str, &str)] = &[
    ("ethereum", "ethereum"),
    ("binancecoin", "bsc"),
    ("polygon", "polygon"),
    ("avalanche-2", "avax"),
    ("arbitrum", "arbitrum"),
    ("optimism", "optimism"),
    ("fantom", "fantom"),
    ("solana", SOLANA_CHAIN),
];

/// Platforms tried first, in order, when resolving a coin's contract
pub const PREFERRED_PLATFORMS: &[&str] = &[
    "ethereum",
    "binance-smart-chain",
    "polygon-pos",
    "avalanche",
    "arbitrum-one",
    "optimistic-ethereum",
];

pub fn chain_for_platform(platform: &str) -> Option<&'static str> {
    PLATFORM_TO_CHAIN
        .iter()
        .find(|(p, _)| *p == platform)
        .map(|(_, chain)| *chain)
}

pub fn platform_for_chain(chain: &str) -> Option<&'static str> {
    PLATFORM_TO_CHAIN
        .iter()
        .find(|(_, c)| *c == chain)
        .map(|(platform, _)| *platform)
}

pub fn native_coin_for_chain(chain: &str) -> Option<&'static str> {
    NATIVE_COIN_TO_CHAIN
        .iter()
        .find(|(_, c)| *c == chain)
        .map(|(coin, _)| *coin)
}

pub fn native_chain_for_coin(coin_id: &str) -> Option<&'static str> {
    NATIVE_COIN_TO_CHAIN
        .iter()
        .find(|(coin, _)| *coin == coin_id)
        .map(|(_, chain)| *chain)
}

pub fn is_evm_chain(chain: &str) -> bool {
    chain != SOLANA_CHAIN
}

/// Extracts `{"key": "url"}` and `{"key": {"rpc": "url"}}` entries.
/// Anything else, including URLs that are not http(s), is skipped. Keys are
/// lower-cased to match the normalized chain keys of incoming requests.
pub fn parse_chain_map(value: &Value) -> HashMap<String, String> {
    let Some(object) = value.as_object() else {
        return HashMap::new();
    };

    object
        .iter()
        .filter_map(|(chain, entry)| {
            let url = match entry {
                Value::String(url) => url.as_str(),
                Value::Object(fields) => fields.get("rpc")?.as_str()?,
                _ => return None,
            };
            match validate_http_url(url) {
                Ok(()) => Some((chain.trim().to_lowercase(), url.to_string())),
                Err(err) => {
                    warn!("Ignoring RPC URL for chain {}: {}", chain, err);
                    None
                }
            }
        })
        .collect()
}

/// Parses a chain file, as YAML first and as JSON when YAML yields nothing
pub fn parse_chain_file(raw: &str) -> HashMap<String, String> {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(value) if !value.is_null() => parse_chain_map(&value),
        Ok(_) => parse_chain_json(raw),
        Err(err) => {
            debug!("Chain file is not YAML, trying JSON: {}", err);
            parse_chain_json(raw)
        }
    }
}

pub fn parse_chain_json(raw: &str) -> HashMap<String, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => parse_chain_map(&value),
        Err(err) => {
            warn!("Failed to parse chain config JSON: {}", err);
            HashMap::new()
        }
    }
}

#[derive(Debug)]
pub struct ChainRegistry {
    rpc_urls: RwLock<HashMap<String, String>>,
    env_json: Option<String>,
    config_path: Option<PathBuf>,
    last_mtime: Mutex<Option<SystemTime>>,
}

impl ChainRegistry {
    pub fn new(
        rpc_urls: HashMap<String, String>,
        env_json: Option<String>,
        config_path: Option<PathBuf>,
    ) -> Self {
        info!(
            "Initialized chain registry with {} chains (config file: {:?})",
            rpc_urls.len(),
            config_path
        );
        Self {
            rpc_urls: RwLock::new(rpc_urls),
            env_json: env_json.filter(|json| !json.trim().is_empty()),
            config_path,
            last_mtime: Mutex::new(None),
        }
    }

    /// Builds the registry from defaults and the `RPC_*` / `CHAIN_CONFIG_*` settings
    pub fn from_config(config: &Config) -> Self {
        let mut rpc_urls: HashMap<String, String> = DEFAULT_RPC_URLS
            .iter()
            .map(|(chain, url)| (chain.to_string(), url.to_string()))
            .collect();

        for (chain, url) in config.rpc_overrides() {
            if let Some(url) = url.map(str::trim).filter(|url| !url.is_empty()) {
                rpc_urls.insert(chain.to_string(), url.to_string());
            }
        }

        let config_path = match config.chain_config_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => DEFAULT_CHAIN_CONFIG_FILES
                .iter()
                .map(Path::new)
                .find(|path| path.exists())
                .map(Path::to_path_buf),
        };

        Self::new(rpc_urls, config.chain_config_json.clone(), config_path)
    }

    /// Merges the inline JSON map, and the config file when it changed on disk
    pub async fn refresh(&self) {
        if let Some(json) = &self.env_json {
            let entries = parse_chain_json(json);
            if !entries.is_empty() {
                self.rpc_urls.write().await.extend(entries);
            }
        }

        let Some(path) = &self.config_path else {
            return;
        };

        let mtime = match tokio::fs::metadata(path).await.and_then(|meta| meta.modified()) {
            Ok(mtime) => mtime,
            Err(err) => {
                debug!("Chain config {} not readable: {}", path.display(), err);
                return;
            }
        };

        let mut last_mtime = self.last_mtime.lock().await;
        if *last_mtime == Some(mtime) {
            return;
        }

        let entries = match tokio::fs::read_to_string(path).await {
            Ok(raw) => parse_chain_file(&raw),
            Err(err) => {
                warn!("Failed to load chains file {}: {}", path.display(), err);
                HashMap::new()
            }
        };

        if entries.is_empty() {
            info!("No valid chain entries found in {}", path.display());
        } else {
            info!("Loaded {} chains from {}", entries.len(), path.display());
            self.rpc_urls.write().await.extend(entries);
        }
        *last_mtime = Some(mtime);
    }

    pub async fn rpc_url(&self, chain: &str) -> Option<String> {
        self.refresh().await;
        self.rpc_urls.read().await.get(chain).cloned()
    }

    /// Known chain keys, sorted
    pub async fn chains(&self) -> Vec<String> {
        self.refresh().await;
        let mut chains: Vec<String> = self.rpc_urls.read().await.keys().cloned().collect();
        chains.sort();
        chains
    }
}
