use crate::models::{ErrorResponse, Market, MarketsParams, SearchParams};
use crate::state::AppState;
use crate::validation::split_ids;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use tracing::{error, info};

/// Handler for USD market data of a set of coins
///
/// # Endpoint: GET /api/coins/markets?ids=a,b
///
/// # Returns
/// * `Json<Vec<Market>>` - Market entries CoinGecko returned, empty when the upstream failed
/// * `400` - When `ids` is missing or empty
pub(crate) async fn get_markets(
    State(state): State<AppState>,
    Query(params): Query<MarketsParams>,
) -> Result<Json<Vec<Market>>, (StatusCode, Json<ErrorResponse>)> {
    let ids = split_ids(params.ids.as_deref().unwrap_or_default());
    if ids.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("ids query param required")),
        ));
    }

    info!("Fetching markets for {} coins", ids.len());
    Ok(Json(state.coingecko.markets(&ids).await))
}

/// Handler for coin search
///
/// # Endpoint: GET /api/coins/search?q=term (or `query=term`)
///
/// # Returns
/// * `Json<Value>` - The raw CoinGecko search result
/// * `400` - When no search term is given
/// * `500` - When CoinGecko could not be queried
pub(crate) async fn search_coins(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let Some(term) = params.term() else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("q parameter required")),
        ));
    };

    match state.coingecko.search(term).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => {
            error!("CoinGecko search failed for {}: {}", term, err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("search failed").with_detail(err.to_string())),
            ))
        }
    }
}
