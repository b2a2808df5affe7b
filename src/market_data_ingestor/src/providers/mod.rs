//! Provider abstraction for market data sources.
//!
//! This module defines the [`DataProvider`] trait, which serves as a unified interface
//! for fetching daily bar data from any market data vendor (e.g., Alpaca, Polygon.io).
//!
//! Each concrete provider implementation should implement [`DataProvider`] to handle
//! vendor-specific API logic and validation.
//!
//! Calls are blocking: the ingestion pipeline paces its own requests and expects the
//! calling thread to wait on the vendor. The trait is object safe so providers can be
//! chosen at runtime (`Box<dyn DataProvider + Send + Sync>`).
//!
//! # Example
//!
//! ```rust
//! use market_data_ingestor::models::{bar_series::BarSeries, request_params::DailyBarsRequest};
//! use market_data_ingestor::providers::{DataProvider, ProviderError};
//!
//! struct MyProvider;
//!
//! impl DataProvider for MyProvider {
//!     fn fetch_daily_bars(&self, request: &DailyBarsRequest) -> Result<BarSeries, ProviderError> {
//!         Ok(BarSeries::empty(request.symbol.clone()))
//!     }
//! }
//! ```

pub mod alpaca_rest;
pub mod errors;

pub use errors::{ProviderError, ProviderInitError};

use crate::models::{bar_series::BarSeries, request_params::DailyBarsRequest};

/// Trait for fetching daily bar data from a market data provider.
pub trait DataProvider {
    /// Fetches the daily bars of one symbol over `[request.start, request.end]`.
    ///
    /// An unknown symbol or a range without trading days is not an error: the
    /// provider returns an empty [`BarSeries`] and lets the caller decide.
    fn fetch_daily_bars(&self, request: &DailyBarsRequest) -> Result<BarSeries, ProviderError>;
}

impl<P: DataProvider + ?Sized> DataProvider for Box<P> {
    fn fetch_daily_bars(&self, request: &DailyBarsRequest) -> Result<BarSeries, ProviderError> {
        (**self).fetch_daily_bars(request)
    }
}

impl<P: DataProvider + ?Sized> DataProvider for &P {
    fn fetch_daily_bars(&self, request: &DailyBarsRequest) -> Result<BarSeries, ProviderError> {
        (**self).fetch_daily_bars(request)
    }
}
