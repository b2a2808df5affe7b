//! Alpaca market data REST API (v2 stock bars).

mod params;
mod provider;
mod response;

pub use params::{Adjustment, AlpacaBarsParams, Feed};
pub use provider::AlpacaProvider;
