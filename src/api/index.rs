// src/api/index.rs

use axum::Json;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Static JSON response for the index endpoint
static INDEX_JSON: OnceLock<Value> = OnceLock::new();

/// Handler for the index endpoint that provides API documentation
///
/// # Endpoint: GET /
///
/// # Returns
/// * `Json<Value>` - JSON response containing API endpoint documentation
pub fn index() -> Json<Value> {
    let value = INDEX_JSON.get_or_init(|| {
        json!({
            "endpoints": [
                {
                    "path": "/",
                    "method": "GET",
                    "description": "API endpoint documentation",
                    "params": {}
                },
                {
                    "path": "/health",
                    "method": "GET",
                    "description": "Service health including the cache backend",
                    "params": {}
                },
                {
                    "path": "/api/chains",
                    "method": "GET",
                    "description": "Chains balances can be computed on",
                    "params": {}
                },
                {
                    "path": "/api/coins/markets",
                    "method": "GET",
                    "description": "USD market data from CoinGecko, cached for a few seconds",
                    "params": {
                        "ids": {
                            "type": "string",
                            "required": true,
                            "description": "Comma separated CoinGecko coin ids"
                        }
                    }
                },
                {
                    "path": "/api/coins/search",
                    "method": "GET",
                    "description": "Search CoinGecko for coins, exchanges and categories",
                    "params": {
                        "q": {
                            "type": "string",
                            "required": true,
                            "description": "Search term, `query` is accepted as an alias"
                        }
                    }
                },
                {
                    "path": "/api/balance",
                    "method": "POST",
                    "description": "Native and token balances of a wallet on one chain, valued in USD",
                    "params": {
                        "chain": {
                            "type": "string",
                            "required": true,
                            "description": "Chain key, e.g. ethereum, bsc, polygon, solana"
                        },
                        "address": {
                            "type": "string",
                            "required": true,
                            "description": "Wallet address on that chain"
                        },
                        "coin_ids": {
                            "type": "array",
                            "items": "string",
                            "required": false,
                            "description": "CoinGecko ids whose token contracts should be checked"
                        },
                        "tokens": {
                            "type": "array",
                            "items": "object",
                            "required": false,
                            "description": "Explicit tokens as {chain?, contract, symbol?, name?}"
                        }
                    }
                },
                {
                    "path": "/api/balance/multi",
                    "method": "POST",
                    "description": "Balances of several wallets across chains with a combined USD total",
                    "params": {
                        "addresses": {
                            "type": "object",
                            "required": true,
                            "description": "Map of chain key to wallet address"
                        },
                        "coin_ids": {
                            "$ref": "#/endpoints/5/params/coin_ids"
                        },
                        "tokens": {
                            "$ref": "#/endpoints/5/params/tokens"
                        }
                    }
                },
            ]
        })
    });

    Json(value.clone())
}
