use crate::{logging::log_request, state::AppState};
use axum::{
    error_handling::HandleErrorLayer,
    http::{Method, StatusCode},
    middleware,
    routing::{get, post},
    BoxError, Router,
};
use std::time::Duration;
use tower::{buffer::BufferLayer, limit::RateLimitLayer, ServiceBuilder};
use tower_governor::{
    errors::GovernorError, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
    GovernorLayer,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use super::{handlers::*, index::index};

pub fn initialize_router(state: AppState) -> Router {
    let error_handler = || {
        ServiceBuilder::new().layer(HandleErrorLayer::new(|err: BoxError| async move {
            match err.downcast_ref::<GovernorError>() {
                Some(GovernorError::TooManyRequests { wait_time, .. }) => (
                    StatusCode::TOO_MANY_REQUESTS,
                    format!("Too many requests, retry in {}s", wait_time),
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Unhandled error: {}", err),
                ),
            }
        }))
    };

    let global_rate_limit = |req_per_sec: u64| {
        ServiceBuilder::new()
            .layer(error_handler())
            .layer(BufferLayer::new(1024))
            .layer(RateLimitLayer::new(req_per_sec, Duration::from_secs(1)))
    };

    let rate_limit_per_ip = |period: u64, burst: u32| {
        let config = Box::new(
            GovernorConfigBuilder::default()
                .per_second(period)
                .burst_size(burst)
                .use_headers()
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .expect("rate limit configuration is valid"),
        );

        ServiceBuilder::new()
            .layer(error_handler())
            .layer(GovernorLayer {
                config: Box::leak(config),
            })
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().include_headers(true))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Balance routes fan out to several RPC and CoinGecko calls, so they get the stricter limits
    let balance_routes = Router::new()
        .route("/api/balance", post(get_balance))
        .route("/api/balance/multi", post(get_multi_balance));

    let read_routes = Router::new()
        .route("/api/coins/markets", get(get_markets))
        .route("/api/coins/search", get(search_coins))
        .route("/api/chains", get(list_chains));

    let (balance_routes, read_routes) = if state.config.rate_limit_enabled {
        (
            balance_routes.layer(global_rate_limit(20).layer(rate_limit_per_ip(1, 10))),
            read_routes.layer(global_rate_limit(1000).layer(rate_limit_per_ip(1, 100))),
        )
    } else {
        (balance_routes, read_routes)
    };

    let request_timeout = Duration::from_secs(state.config.request_timeout_seconds);

    Router::new()
        .merge(balance_routes)
        .merge(read_routes)
        // Base routes
        .route("/", get(|| async { index() }))
        .route("/health", get(health_check))
        // Apply common middleware
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(log_request))
        .layer(trace_layer)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        fake_rpc_node, spawn_upstream, test_config, test_state, SOL_WALLET, WALLET,
    };
    use axum::{body::Body, http::Request, response::Response};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response: Response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_request(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn test_index_and_health() {
        let (state, _) = test_state().await;
        let router = initialize_router(state);

        let (status, json) = send(router.clone(), get_request("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["endpoints"].as_array().unwrap().len() >= 7);

        let (status, json) = send(router, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cache"]["backend"], "memory");
        assert_eq!(json["chains"], 9);
    }

    #[tokio::test]
    async fn test_markets_route() {
        let (state, _) = test_state().await;
        let router = initialize_router(state);

        let (status, json) = send(router.clone(), get_request("/api/coins/markets")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "ids query param required"}));

        let (status, _) = send(router.clone(), get_request("/api/coins/markets?ids=,%20,")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = send(
            router,
            get_request("/api/coins/markets?ids=tether,ethereum,nope"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let markets = json.as_array().unwrap();
        assert_eq!(markets.len(), 2);
        assert_eq!(markets[0]["market_cap_rank"], 1);
    }

    #[tokio::test]
    async fn test_search_route() {
        let (state, _) = test_state().await;
        let router = initialize_router(state);

        let (status, json) = send(router.clone(), get_request("/api/coins/search")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "q parameter required");

        let (status, json) = send(router.clone(), get_request("/api/coins/search?query=pepe")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["coins"][0]["id"], "pepe");

        let (status, json) = send(router, get_request("/api/coins/search?q=fail")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "search failed");
        assert!(json["detail"].is_string());
    }

    #[tokio::test]
    async fn test_balance_route() {
        let (state, _) = test_state().await;
        let router = initialize_router(state);

        let (status, json) = send(router.clone(), post_request("/api/balance", "not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "chain and address required");

        let (status, _) = send(
            router.clone(),
            post_request("/api/balance", json!({"chain": "ethereum", "address": "  "}).to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let body = json!({"chain": " Ethereum ", "address": WALLET, "coin_ids": ["tether"]});
        let (status, json) = send(router, post_request("/api/balance", body.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["chain"], "ethereum");
        assert_eq!(json["native"]["balance"], 1.5);
        assert_eq!(json["tokens"][0]["symbol"], "USDT");
        assert_eq!(json["total_usd"], 5500.0);
        assert_eq!(json["errors"], json!([]));
    }

    #[tokio::test]
    async fn test_multi_balance_route() {
        let (state, _) = test_state().await;
        let router = initialize_router(state);

        let (status, json) = send(router.clone(), post_request("/api/balance/multi", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "addresses object required");

        let body = json!({"addresses": {"ethereum": WALLET, "solana": SOL_WALLET}});
        let (status, json) =
            send(router, post_request("/api/balance/multi", body.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["results"]["ethereum"]["total_usd"], 3000.0);
        assert_eq!(json["results"]["solana"]["total_usd"], 200.0);
        assert_eq!(json["total_usd"], 3200.0);
    }

    #[tokio::test]
    async fn test_chains_route() {
        let (state, _) = test_state().await;
        let (status, json) = send(initialize_router(state), get_request("/api/chains")).await;
        assert_eq!(status, StatusCode::OK);

        let chains = json.as_array().unwrap();
        let solana = chains.iter().find(|c| c["chain"] == "solana").unwrap();
        assert_eq!(solana["is_evm"], false);
        assert_eq!(solana["native_coin_id"], "solana");
        let cronos = chains.iter().find(|c| c["chain"] == "cronos").unwrap();
        assert_eq!(cronos["is_evm"], true);
        assert_eq!(cronos["native_coin_id"], Value::Null);
    }

    #[tokio::test]
    async fn test_per_ip_limit_on_balance_routes() {
        let (mut state, _) = test_state().await;
        let mut config = (*state.config).clone();
        config.rate_limit_enabled = true;
        state.config = std::sync::Arc::new(config);
        let router = initialize_router(state);

        let request = |ip: &str| {
            Request::builder()
                .method(Method::POST)
                .uri("/api/balance")
                .header("x-forwarded-for", ip)
                .body(Body::from("{}"))
                .unwrap()
        };

        // Burst of 10, the empty body is rejected before any upstream call
        for _ in 0..10 {
            let (status, _) = send(router.clone(), request("198.51.100.4")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        let response = router.clone().oneshot(request("198.51.100.4")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        // Other clients keep their own budget
        let (status, _) = send(router, request("198.51.100.5")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let slow_coingecko = Router::new().route(
            "/search",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                axum::Json(json!({"coins": []}))
            }),
        );
        let coingecko_url = spawn_upstream(slow_coingecko).await;
        let rpc_url = spawn_upstream(fake_rpc_node()).await;
        let mut config = test_config(&coingecko_url, &rpc_url);
        config.request_timeout_seconds = 1;
        let router = initialize_router(AppState::new(config).unwrap());

        let (status, _) = send(router, get_request("/api/coins/search?q=pepe")).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_rate_limited_router() {
        let (mut state, _) = test_state().await;
        let mut config = (*state.config).clone();
        config.rate_limit_enabled = true;
        state.config = std::sync::Arc::new(config);
        let router = initialize_router(state);

        let (status, _) = send(router.clone(), get_request("/")).await;
        assert_eq!(status, StatusCode::OK);

        let request = Request::builder()
            .uri("/api/coins/markets")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
