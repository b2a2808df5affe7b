//! Daily market data: vendor providers, calendar helpers and the indicator engine.

pub mod indicators;
pub mod models;
pub mod providers;
pub mod tz;
