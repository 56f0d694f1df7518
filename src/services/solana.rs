use crate::{errors::ApiError, validation::validate_pubkey, Result};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use std::time::Duration;
use tracing::info;

const RPC_TIMEOUT: Duration = Duration::from_secs(20);

/// SOL balance of `address` in whole SOL
pub async fn get_solana_balance(rpc_url: &str, address: &str) -> Result<f64> {
    let pubkey = validate_pubkey(address.trim()).map_err(ApiError::InvalidInput)?;

    let client = RpcClient::new_with_timeout(rpc_url.to_string(), RPC_TIMEOUT);
    info!("Fetching SOL balance for: {}", pubkey);

    let lamports = client.get_balance(&pubkey).await?;
    Ok(lamports_to_sol(lamports))
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lamports_to_sol() {
        assert_eq!(lamports_to_sol(0), 0.0);
        assert_eq!(lamports_to_sol(1_500_000_000), 1.5);
        assert_eq!(lamports_to_sol(1), 1e-9);
    }

    #[tokio::test]
    async fn test_invalid_address_is_rejected_before_rpc() {
        let result = get_solana_balance("http://127.0.0.1:1", "not-a-key").await;
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unreachable_rpc_is_an_error() {
        let result = get_solana_balance(
            "http://127.0.0.1:1",
            "verifycLy8mB96wd9wqq3WDXQwM4oU6r42Th37Db9fC",
        )
        .await;
        assert!(matches!(result, Err(ApiError::ClientError(_))));
    }
}
