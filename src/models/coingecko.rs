use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One entry of `/coins/markets`
///
/// Only the fields the balance computation reads are typed, everything else
/// CoinGecko returns is kept in `extra` so the markets endpoint can pass it on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Market {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Market {
    /// Current USD price, `0.0` when CoinGecko has none
    pub fn price_or_zero(&self) -> f64 {
        self.current_price.unwrap_or(0.0)
    }

    pub fn upper_symbol(&self) -> Option<String> {
        self.symbol
            .as_deref()
            .filter(|symbol| !symbol.is_empty())
            .map(str::to_uppercase)
    }
}

/// Subset of `/coins/{id}` used to resolve token contracts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoinDetail {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub platforms: BTreeMap<String, Option<String>>,
}

/// A contract address together with the CoinGecko platform it lives on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractMatch {
    pub contract: String,
    pub platform: String,
}

/// Subset of `/coins/{platform}/contract/{address}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenContractInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub image: Option<TokenImage>,
    #[serde(default)]
    pub market_data: Option<TokenMarketData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenImage {
    #[serde(default)]
    pub small: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenMarketData {
    #[serde(default)]
    pub current_price: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

impl TokenContractInfo {
    pub fn usd_price(&self) -> Option<f64> {
        self.market_data
            .as_ref()
            .and_then(|data| data.current_price.as_ref())
            .and_then(|prices| prices.get("usd").copied())
    }

    pub fn price_change_24h(&self) -> Option<f64> {
        self.market_data
            .as_ref()
            .and_then(|data| data.price_change_percentage_24h)
    }

    pub fn logo(&self) -> Option<String> {
        self.image.as_ref().and_then(|image| image.small.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_market_keeps_unknown_fields() {
        let market: Market = serde_json::from_value(json!({
            "id": "ethereum",
            "symbol": "eth",
            "name": "Ethereum",
            "current_price": 3150.25,
            "price_change_percentage_24h": -1.5,
            "market_cap": 380000000000u64,
            "image": "https://assets.coingecko.com/eth.png"
        }))
        .unwrap();

        assert_eq!(market.upper_symbol(), Some("ETH".to_string()));
        assert_eq!(market.price_or_zero(), 3150.25);
        assert_eq!(market.extra.get("market_cap"), Some(&json!(380000000000u64)));

        let out = serde_json::to_value(&market).unwrap();
        assert_eq!(out["market_cap"], json!(380000000000u64));
        assert_eq!(out["id"], "ethereum");
    }

    #[test]
    fn test_market_with_null_price() {
        let market: Market =
            serde_json::from_value(json!({"id": "obscure", "current_price": null})).unwrap();
        assert_eq!(market.price_or_zero(), 0.0);
        assert_eq!(market.upper_symbol(), None);
    }

    #[test]
    fn test_token_contract_info_accessors() {
        let info: TokenContractInfo = serde_json::from_value(json!({
            "name": "Tether",
            "symbol": "usdt",
            "image": {"thumb": "t.png", "small": "s.png"},
            "market_data": {
                "current_price": {"usd": 1.001, "eur": 0.92},
                "price_change_percentage_24h": 0.01
            }
        }))
        .unwrap();
        assert_eq!(info.usd_price(), Some(1.001));
        assert_eq!(info.price_change_24h(), Some(0.01));
        assert_eq!(info.logo(), Some("s.png".to_string()));

        let empty = TokenContractInfo::default();
        assert_eq!(empty.usd_price(), None);
        assert_eq!(empty.logo(), None);
    }
}
