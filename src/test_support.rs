//! In-process fakes of CoinGecko and the chain RPC nodes, bound to
//! ephemeral localhost ports.

use crate::{config::Config, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    net::{SocketAddr, TcpListener},
    sync::{Arc, Mutex},
};

pub const WALLET: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
pub const SOL_WALLET: &str = "verifycLy8mB96wd9wqq3WDXQwM4oU6r42Th37Db9fC";
/// USDT on Ethereum, the only contract the fake node knows
pub const USDT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";
pub const USDC_SPL: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Serves `router` on 127.0.0.1 and returns its base URL
pub async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(router.into_make_service())
            .await
            .unwrap();
    });

    format!("http://{addr}")
}

/// Records which upstream calls a fake received
#[derive(Clone, Default)]
pub struct UpstreamCalls(Arc<Mutex<Vec<String>>>);

impl UpstreamCalls {
    pub fn record(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn recorded(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// JSON-RPC node answering both EVM and Solana balance calls.
///
/// The wallet holds 1.5 ETH, 2500 USDT (6 decimals) and 2 SOL. Calls to any
/// other contract revert.
pub fn fake_rpc_node() -> Router {
    Router::new().route(
        "/",
        post(|Json(req): Json<Value>| async move {
            let method = req["method"].as_str().unwrap_or_default();
            let mut reply = match method {
                "eth_getBalance" => json!({"result": "0x14d1120d7b160000"}),
                "eth_call" => {
                    let call = &req["params"][0];
                    let to = call["to"].as_str().unwrap_or_default();
                    let data = call["data"].as_str().unwrap_or_default();
                    if to != USDT {
                        json!({"error": {"code": 3, "message": "execution reverted"}})
                    } else if data == "0x313ce567" {
                        json!({"result": format!("0x{:064x}", 6)})
                    } else {
                        json!({"result": format!("0x{:064x}", 2_500_000_000u64)})
                    }
                }
                "getVersion" => json!({
                    "result": {"solana-core": "2.0.13", "feature-set": 1}
                }),
                "getBalance" => json!({
                    "result": {"context": {"slot": 1}, "value": 2_000_000_000u64}
                }),
                _ => json!({"error": {"code": -32601, "message": "method not found"}}),
            };
            reply["jsonrpc"] = json!("2.0");
            reply["id"] = req["id"].clone();
            Json(reply)
        }),
    )
}

fn market(id: &str) -> Option<Value> {
    let (symbol, name, price, change) = match id {
        "ethereum" => ("eth", "Ethereum", 2000.0, 1.25),
        "tether" => ("usdt", "Tether", 1.0, 0.01),
        "usd-coin" => ("usdc", "USDC", 1.0, -0.02),
        "solana" => ("sol", "Solana", 100.0, 3.5),
        _ => return None,
    };
    Some(json!({
        "id": id,
        "symbol": symbol,
        "name": name,
        "image": format!("https://img.example/{id}.png"),
        "current_price": price,
        "price_change_percentage_24h": change,
        "market_cap_rank": 1
    }))
}

async fn coins(
    State(calls): State<UpstreamCalls>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    // `/coins/markets` shares the route with `/coins/{id}`
    if id == "markets" {
        let ids = params.get("ids").cloned().unwrap_or_default();
        calls.record(format!("markets:{ids}"));
        let markets: Vec<Value> = ids.split(',').filter_map(market).collect();
        return Json(markets).into_response();
    }

    calls.record(format!("detail:{id}"));
    let platforms = match id.as_str() {
        "tether" => json!({"ethereum": USDT, "tron": "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t"}),
        "usd-coin" => json!({"solana": USDC_SPL}),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(json!({"id": id, "platforms": platforms})).into_response()
}

async fn contract(
    State(calls): State<UpstreamCalls>,
    Path((platform, contract)): Path<(String, String)>,
) -> Response {
    calls.record(format!("contract:{platform}:{contract}"));
    if platform != "ethereum" || contract != USDT {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({
        "name": "Tether",
        "symbol": "usdt",
        "image": {"small": "https://img.example/usdt-small.png"},
        "market_data": {
            "current_price": {"usd": 1.0},
            "price_change_percentage_24h": 0.01
        }
    }))
    .into_response()
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Response {
    match params.get("query").map(String::as_str) {
        Some("fail") => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        Some(query) => Json(json!({"coins": [{"id": query, "name": query}]})).into_response(),
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}

pub fn fake_coingecko(calls: UpstreamCalls) -> Router {
    Router::new()
        .route("/coins/:id", get(coins))
        .route("/coins/:id/contract/:contract", get(contract))
        .route("/search", get(search))
        .with_state(calls)
}

/// Configuration pointing every upstream used in tests at the fakes
pub fn test_config(coingecko_url: &str, rpc_url: &str) -> Config {
    Config {
        coingecko_api_url: coingecko_url.to_string(),
        rpc_eth: Some(rpc_url.to_string()),
        rpc_solana: Some(rpc_url.to_string()),
        chain_config_path: Some("/nonexistent/chains.json".to_string()),
        rate_limit_enabled: false,
        ..Config::default()
    }
}

/// Application state wired to fresh fakes, plus the CoinGecko call log
pub async fn test_state() -> (AppState, UpstreamCalls) {
    let calls = UpstreamCalls::default();
    let coingecko_url = spawn_upstream(fake_coingecko(calls.clone())).await;
    let rpc_url = spawn_upstream(fake_rpc_node()).await;
    let state = AppState::new(test_config(&coingecko_url, &rpc_url)).unwrap();
    (state, calls)
}
