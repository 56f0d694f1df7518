use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Io(#[from] tokio::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unexpected Error: {0}")]
    Custom(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error(transparent)]
    ClientError(Box<solana_client::client_error::ClientError>),

    #[error(transparent)]
    ParsePubkeyError(#[from] solana_sdk::pubkey::ParsePubkeyError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    RedisError(#[from] redis::RedisError),

    #[error("Unknown chain: {0}")]
    UnknownChain(String),
}

// Boxed to keep the enum small
impl From<solana_client::client_error::ClientError> for ApiError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        ApiError::ClientError(Box::new(err))
    }
}
