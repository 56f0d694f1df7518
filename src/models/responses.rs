use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Native coin holdings of a wallet on one chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NativeBalance {
    pub symbol: String,
    pub balance: f64,
    pub usd_price: Option<f64>,
    pub usd_value: f64,
    pub price_change_24h: Option<f64>,
}

/// Token holdings of a wallet, either resolved from a CoinGecko id or
/// requested explicitly by contract
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenBalance {
    pub coin_id: Option<String>,
    pub symbol: String,
    pub name: String,
    pub contract: Option<String>,
    /// CoinGecko platform key of the contract
    pub platform: Option<String>,
    /// Chain key the balance was read from
    pub chain: Option<String>,
    pub balance: f64,
    pub usd_price: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub usd_value: f64,
    pub logo: Option<String>,
}

/// Result of `POST /api/balance`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainBalance {
    pub chain: String,
    pub address: String,
    pub native: Option<NativeBalance>,
    pub tokens: Vec<TokenBalance>,
    /// Non fatal failures collected while computing the balance
    pub errors: Vec<String>,
    pub total_usd: f64,
}

impl ChainBalance {
    pub fn new(chain: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            address: address.into(),
            native: None,
            tokens: Vec::new(),
            errors: Vec::new(),
            total_usd: 0.0,
        }
    }

    /// Recomputes `total_usd` from the native and token entries
    pub fn update_total(&mut self) {
        let native = self.native.as_ref().map_or(0.0, |native| native.usd_value);
        let tokens: f64 = self.tokens.iter().map(|token| token.usd_value).sum();
        self.total_usd = native + tokens;
    }
}

/// Result of `POST /api/balance/multi`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiBalanceResponse {
    pub results: BTreeMap<String, ChainBalance>,
    pub total_usd: f64,
}

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// A chain known to the registry
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainInfo {
    pub chain: String,
    pub is_evm: bool,
    /// CoinGecko id of the native coin, when known
    pub native_coin_id: Option<String>,
}
