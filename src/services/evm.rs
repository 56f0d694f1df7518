//! Minimal EVM JSON-RPC client for native and ERC-20 balances.

use crate::{errors::ApiError, validation::validate_evm_address, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::debug;

const RPC_TIMEOUT: Duration = Duration::from_secs(20);

/// `decimals()`
const DECIMALS_SELECTOR: &str = "0x313ce567";
/// `balanceOf(address)`
const BALANCE_OF_SELECTOR: &str = "0x70a08231";

/// Decimals assumed when a token does not answer `decimals()`
pub const DEFAULT_TOKEN_DECIMALS: u32 = 18;
pub const NATIVE_DECIMALS: u32 = 18;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Clone)]
pub struct EvmClient {
    http: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

impl EvmClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Performs a JSON-RPC call and returns the hex string result
    async fn call(&self, url: &str, method: &str, params: Value) -> Result<String> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(url)
            .json(&request)
            .timeout(RPC_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json::<RpcResponse>()
            .await?;

        if let Some(error) = response.error {
            return Err(ApiError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        match response.result {
            Some(Value::String(result)) => Ok(result),
            other => Err(ApiError::Custom(format!(
                "Unexpected {method} result: {other:?}"
            ))),
        }
    }

    /// Native coin balance in whole units
    pub async fn native_balance(&self, url: &str, address: &str) -> Result<f64> {
        let address = validate_evm_address(address).map_err(ApiError::InvalidInput)?;
        let wei = self
            .call(url, "eth_getBalance", json!([address, "latest"]))
            .await?;
        Ok(scale_units(hex_to_f64(&wei)?, NATIVE_DECIMALS))
    }

    pub async fn erc20_decimals(&self, url: &str, contract: &str) -> Result<u32> {
        let contract = validate_evm_address(contract).map_err(ApiError::InvalidInput)?;
        let raw = self
            .call(
                url,
                "eth_call",
                json!([{"to": contract, "data": DECIMALS_SELECTOR}, "latest"]),
            )
            .await?;
        let decimals = hex_to_f64(&raw)?;
        if decimals > 255.0 {
            return Err(ApiError::Custom(format!(
                "Token {contract} reported invalid decimals {decimals}"
            )));
        }
        Ok(decimals as u32)
    }

    /// ERC-20 balance in whole token units
    pub async fn erc20_balance(&self, url: &str, contract: &str, address: &str) -> Result<f64> {
        let contract = validate_evm_address(contract).map_err(ApiError::InvalidInput)?;
        let address = validate_evm_address(address).map_err(ApiError::InvalidInput)?;

        let decimals = match self.erc20_decimals(url, &contract).await {
            Ok(decimals) => decimals,
            Err(err) => {
                debug!(
                    "decimals() failed for {}, assuming {}: {}",
                    contract, DEFAULT_TOKEN_DECIMALS, err
                );
                DEFAULT_TOKEN_DECIMALS
            }
        };

        let raw = self
            .call(
                url,
                "eth_call",
                json!([{"to": contract, "data": encode_balance_of(&address)}, "latest"]),
            )
            .await?;
        Ok(scale_units(hex_to_f64(&raw)?, decimals))
    }
}

/// Calldata for `balanceOf(address)`, `address` must already be validated
pub fn encode_balance_of(address: &str) -> String {
    let hex = address.trim_start_matches("0x");
    format!("{BALANCE_OF_SELECTOR}{hex:0>64}")
}

/// Parses a `0x` quantity or ABI word into a float.
///
/// Values can exceed `u128` (a full uint256), so digits are accumulated in
/// floating point.
pub fn hex_to_f64(value: &str) -> Result<f64> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| ApiError::Custom(format!("Expected 0x-prefixed hex, got `{value}`")))?;
    if digits.is_empty() {
        return Err(ApiError::Custom("Empty hex result".to_string()));
    }

    digits.chars().try_fold(0.0_f64, |acc, c| {
        c.to_digit(16)
            .map(|digit| acc * 16.0 + f64::from(digit))
            .ok_or_else(|| ApiError::Custom(format!("Invalid hex digit `{c}` in `{value}`")))
    })
}

pub fn scale_units(raw: f64, decimals: u32) -> f64 {
    raw / 10_f64.powi(decimals as i32)
}
