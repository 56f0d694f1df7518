//! API request handlers.
//! Each module corresponds to a specific API endpoint or related group of endpoints.

pub mod balance; // Single and multi-chain wallet balances
pub mod chains; // Known chains
pub mod coins; // CoinGecko market data and search
pub mod health; // Liveness and cache status

// Re-export handlers for easier access
pub(crate) use balance::{get_balance, get_multi_balance};
pub(crate) use chains::list_chains;
pub(crate) use coins::{get_markets, search_coins};
pub(crate) use health::health_check;
