//! A collection of time-series bars for a specific symbol.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::models::bar::{Bar, DailyBar};

/// Represents a complete set of time-series data for a single symbol.
///
/// This struct groups a vector of [`Bar`]s with their corresponding symbol,
/// making the data set self-describing.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    /// The symbol this data represents (e.g., "AAPL").
    pub symbol: String,
    /// The collection of OHLCV bars, in whatever order the vendor sent them.
    pub bars: Vec<Bar>,
}

impl BarSeries {
    /// Creates a series for `symbol`.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    /// An empty series, which is what providers return for unknown symbols.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self::new(symbol, Vec::new())
    }

    /// Whether the vendor returned any bars at all.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Normalizes the series into a date-indexed daily series.
    ///
    /// Each bar is pinned to its exchange-local calendar date, the result is sorted
    /// ascending, later bars win when two share a date, and anything outside
    /// `[start, end]` (inclusive) is dropped.
    pub fn to_daily(&self, exchange_tz: Tz, start: NaiveDate, end: NaiveDate) -> Vec<DailyBar> {
        let mut by_date: BTreeMap<NaiveDate, DailyBar> = BTreeMap::new();
        for bar in &self.bars {
            let daily = bar.to_daily(exchange_tz);
            if daily.date < start || daily.date > end {
                continue;
            }
            by_date.insert(daily.date, daily);
        }
        by_date.into_values().collect()
    }
}
