use crate::{
    cache::CacheClient,
    errors::ApiError,
    models::{CoinDetail, ContractMatch, Market, TokenContractInfo},
    services::chain_registry::PREFERRED_PLATFORMS,
    Result,
};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

const MARKETS_TIMEOUT: Duration = Duration::from_secs(12);
const COIN_DETAIL_TIMEOUT: Duration = Duration::from_secs(12);
const CONTRACT_TIMEOUT: Duration = Duration::from_secs(10);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// CoinGecko v3 client with cached market and coin detail lookups
#[derive(Clone)]
pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
    cache: CacheClient,
    markets_ttl: Duration,
    detail_ttl: Duration,
}

impl CoinGeckoClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        cache: CacheClient,
        markets_ttl: Duration,
        detail_ttl: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            markets_ttl,
            detail_ttl,
        }
    }

    /// Endpoint URL with every segment percent-encoded, so ids and contracts
    /// cannot add path, query or fragment parts
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Config(format!("Invalid CoinGecko URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("CoinGecko URL has no path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Market data for the given ids in USD.
    ///
    /// Failures are logged and produce an empty list, which is not cached.
    pub async fn markets(&self, ids: &[String]) -> Vec<Market> {
        if ids.is_empty() {
            return Vec::new();
        }

        let mut sorted = ids.to_vec();
        sorted.sort();
        let key = sorted.join(",");
        let cache_key = format!("coingecko:markets:{key}");

        if let Some(markets) = self.cache.get_json::<Vec<Market>>(&cache_key).await {
            return markets;
        }

        match self.fetch_markets(&key, ids.len()).await {
            Ok(markets) => {
                self.cache
                    .set_json(&cache_key, &markets, self.markets_ttl)
                    .await;
                markets
            }
            Err(err) => {
                warn!("CoinGecko markets fetch failed for {}: {}", key, err);
                Vec::new()
            }
        }
    }

    async fn fetch_markets(&self, ids: &str, count: usize) -> Result<Vec<Market>> {
        let per_page = count.to_string();
        let markets = self
            .http
            .get(self.endpoint(&["coins", "markets"])?)
            .query(&[
                ("vs_currency", "usd"),
                ("ids", ids),
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("page", "1"),
                ("sparkline", "false"),
                ("price_change_percentage", "24h"),
            ])
            .timeout(MARKETS_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Market>>()
            .await?;
        Ok(markets)
    }

    /// Coin detail with platform contract addresses, `None` on failure
    pub async fn coin_detail(&self, coin_id: &str) -> Option<CoinDetail> {
        let cache_key = format!("coingecko:detail:{coin_id}");
        if let Some(detail) = self.cache.get_json::<CoinDetail>(&cache_key).await {
            return Some(detail);
        }

        match self.fetch_coin_detail(coin_id).await {
            Ok(detail) => {
                self.cache.set_json(&cache_key, &detail, self.detail_ttl).await;
                Some(detail)
            }
            Err(err) => {
                warn!("CoinGecko coin detail failed for {}: {}", coin_id, err);
                None
            }
        }
    }

    async fn fetch_coin_detail(&self, coin_id: &str) -> Result<CoinDetail> {
        let detail = self
            .http
            .get(self.endpoint(&["coins", coin_id])?)
            .query(&[
                ("localization", "false"),
                ("tickers", "false"),
                ("market_data", "false"),
                ("community_data", "false"),
                ("developer_data", "false"),
                ("sparkline", "false"),
            ])
            .timeout(COIN_DETAIL_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json::<CoinDetail>()
            .await?;
        Ok(detail)
    }

    /// Resolves the contract address of a coin, preferring well known platforms
    pub async fn find_contract(&self, coin_id: &str) -> Option<ContractMatch> {
        let detail = self.coin_detail(coin_id).await?;
        select_contract(&detail)
    }

    /// Token metadata and USD price looked up by contract address
    pub async fn token_by_contract(
        &self,
        platform: &str,
        contract: &str,
    ) -> Option<TokenContractInfo> {
        let url = self
            .endpoint(&["coins", platform, "contract", contract])
            .map_err(|err| warn!("Cannot build contract URL for {}: {}", contract, err))
            .ok()?;
        let response = self
            .http
            .get(url)
            .timeout(CONTRACT_TIMEOUT)
            .send()
            .await
            .map_err(|err| warn!("CoinGecko contract lookup failed for {}: {}", contract, err))
            .ok()?;

        if !response.status().is_success() {
            info!(
                "CoinGecko has no data for contract {} on {} ({})",
                contract,
                platform,
                response.status()
            );
            return None;
        }

        response
            .json::<TokenContractInfo>()
            .await
            .map_err(|err| warn!("Undecodable contract info for {}: {}", contract, err))
            .ok()
    }

    /// Raw `/search` response
    pub async fn search(&self, query: &str) -> Result<Value> {
        let value = self
            .http
            .get(self.endpoint(&["search"])?)
            .query(&[("query", query)])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(value)
    }
}

/// Picks the first non-empty contract in preferred platform order, then any
/// other non-empty platform
pub fn select_contract(detail: &CoinDetail) -> Option<ContractMatch> {
    let non_empty = |platform: &str| {
        detail
            .platforms
            .get(platform)
            .and_then(|contract| contract.as_deref())
            .filter(|contract| !contract.is_empty())
            .map(|contract| ContractMatch {
                contract: contract.to_string(),
                platform: platform.to_string(),
            })
    };

    PREFERRED_PLATFORMS
        .iter()
        .find_map(|platform| non_empty(platform))
        .or_else(|| detail.platforms.keys().find_map(|platform| non_empty(platform)))
}
