use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::providers::alpaca_rest::AlpacaBarsParams;

/// Universal parameters for requesting daily bars for one symbol from any market data provider.
///
/// It is intended as the standard input for all
/// [`DataProvider`](crate::providers::DataProvider) implementations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DailyBarsRequest {
    /// Symbol to request (e.g. `"AAPL"`).
    pub symbol: String,

    /// First exchange date of the requested range (inclusive).
    pub start: NaiveDate,

    /// Last exchange date of the requested range (inclusive).
    ///
    /// Providers whose APIs take an exclusive end are responsible for translating it.
    pub end: NaiveDate,

    /// Optional, provider-specific parameters.
    #[serde(default)]
    pub provider_specific: ProviderParams,
}

impl DailyBarsRequest {
    /// Builds a request with no provider-specific options.
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
            provider_specific: ProviderParams::None,
        }
    }
}

/// An enum to hold provider-specific request parameters.
///
/// This allows callers to specify detailed, per-request options for a
/// particular provider without cluttering the universal `DailyBarsRequest`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub enum ProviderParams {
    #[default]
    None,
    Alpaca(AlpacaBarsParams),
}
