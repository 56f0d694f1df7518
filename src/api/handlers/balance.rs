use crate::models::{
    BalanceRequest, ChainBalance, ErrorResponse, MultiBalanceRequest, MultiBalanceResponse,
};
use crate::services::CoinScope;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::{info, warn};

type BalanceResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Parses a JSON body regardless of content type, an unparsable body counts as empty
fn parse_lenient<T: serde::de::DeserializeOwned + Default>(body: &Bytes) -> T {
    if body.is_empty() {
        return T::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|err| {
        warn!("Ignoring unparsable request body: {}", err);
        T::default()
    })
}

/// Handler for the balance of one wallet on one chain
///
/// # Endpoint: POST /api/balance
///
/// # Arguments
/// * `body` - `{chain, address, coin_ids?, tokens?}`
///
/// # Returns
/// * `Json<ChainBalance>` - Native and token holdings with USD values
/// * `400` - When chain or address is missing
pub(crate) async fn get_balance(
    State(state): State<AppState>,
    body: Bytes,
) -> BalanceResult<ChainBalance> {
    let payload: BalanceRequest = parse_lenient(&body);

    let chain = payload
        .chain
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let address = payload.address.as_deref().unwrap_or_default().trim();

    if chain.is_empty() || address.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("chain and address required")),
        ));
    }

    let result = state
        .portfolio
        .compute_balance_for_chain(
            &chain,
            address,
            payload.coin_ids.as_deref().unwrap_or_default(),
            payload.tokens.as_deref().unwrap_or_default(),
            CoinScope::All,
        )
        .await;

    info!(
        "Balance for {} on {}: {:.2} USD ({} errors)",
        address,
        chain,
        result.total_usd,
        result.errors.len()
    );
    Ok(Json(result))
}

/// Handler for wallet balances across several chains
///
/// # Endpoint: POST /api/balance/multi
///
/// # Arguments
/// * `body` - `{addresses: {chain: address}, coin_ids?, tokens?}`
///
/// # Returns
/// * `Json<MultiBalanceResponse>` - Per chain results and the summed USD total
/// * `400` - When no address is given
pub(crate) async fn get_multi_balance(
    State(state): State<AppState>,
    body: Bytes,
) -> BalanceResult<MultiBalanceResponse> {
    let payload: MultiBalanceRequest = parse_lenient(&body);

    let Some(addresses) = payload.addresses.filter(|addresses| {
        addresses
            .iter()
            .any(|(chain, address)| !chain.trim().is_empty() && !address.trim().is_empty())
    }) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("addresses object required")),
        ));
    };

    let response = state
        .portfolio
        .compute_multi(
            &addresses,
            payload.coin_ids.as_deref().unwrap_or_default(),
            payload.tokens.as_deref().unwrap_or_default(),
        )
        .await;

    info!(
        "Multi-chain balance over {} chains: {:.2} USD",
        response.results.len(),
        response.total_usd
    );
    Ok(Json(response))
}
