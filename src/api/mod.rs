//! HTTP surface of the portfolio service: wallet balances, CoinGecko
//! market data and search, and the chain list.

/// Balance, coin, chain and health handlers
pub mod handlers;

/// Endpoint listing served at `/`
pub mod index;

/// Router assembly with rate limits and common middleware
pub mod init;

pub use init::initialize_router;
