use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An explicitly requested ERC-20 token
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenSpec {
    /// Chain key, defaults to the chain of the request
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub contract: Option<String>,
    /// Fallback symbol when CoinGecko does not know the contract
    #[serde(default)]
    pub symbol: Option<String>,
    /// Fallback name when CoinGecko does not know the contract
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of `POST /api/balance`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceRequest {
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub coin_ids: Option<Vec<String>>,
    #[serde(default)]
    pub tokens: Option<Vec<TokenSpec>>,
}

/// Body of `POST /api/balance/multi`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiBalanceRequest {
    /// Chain key to wallet address
    #[serde(default)]
    pub addresses: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub coin_ids: Option<Vec<String>>,
    #[serde(default)]
    pub tokens: Option<Vec<TokenSpec>>,
}

/// Query of `GET /api/coins/markets`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MarketsParams {
    pub ids: Option<String>,
}

/// Query of `GET /api/coins/search`, `q` wins over `query`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchParams {
    pub q: Option<String>,
    pub query: Option<String>,
}

impl SearchParams {
    pub fn term(&self) -> Option<&str> {
        self.q
            .as_deref()
            .filter(|q| !q.is_empty())
            .or_else(|| self.query.as_deref().filter(|q| !q.is_empty()))
    }
}
