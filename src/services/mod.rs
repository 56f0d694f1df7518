pub mod chain_registry;
pub mod coingecko;
pub mod evm;
pub mod portfolio;
pub mod solana;

pub use portfolio::{CoinScope, PortfolioService};
