//! Request, response and upstream API models.

mod coingecko; // CoinGecko payloads
mod params; // Request bodies and query strings
mod responses; // API response models

// Re-export all models for easier access
pub use coingecko::*;
pub use params::*;
pub use responses::*;
