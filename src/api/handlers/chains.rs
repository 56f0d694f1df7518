use crate::models::ChainInfo;
use crate::services::chain_registry::{is_evm_chain, native_coin_for_chain};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;

/// Handler listing the chains balances can be computed on
///
/// # Endpoint: GET /api/chains
pub(crate) async fn list_chains(State(state): State<AppState>) -> Json<Vec<ChainInfo>> {
    let chains = state
        .registry
        .chains()
        .await
        .into_iter()
        .map(|chain| ChainInfo {
            is_evm: is_evm_chain(&chain),
            native_coin_id: native_coin_for_chain(&chain).map(ToOwned::to_owned),
            chain,
        })
        .collect();

    Json(chains)
}
