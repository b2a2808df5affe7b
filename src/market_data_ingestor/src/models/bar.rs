//! Canonical in-memory representations of OHLCV bars.
//!
//! [`Bar`] is what every [`DataProvider`](crate::providers::DataProvider) hands back:
//! a vendor-agnostic bar stamped with the instant the vendor reported. [`DailyBar`] is
//! the same data after it has been pinned to an exchange calendar date, which is the
//! shape the indicator engine and the bar store work with.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::tz;

/// A single time-series bar (OHLCV) for a given timestamp.
///
/// This struct is vendor-agnostic and is used throughout the data ingestion pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// The timestamp for this bar (UTC).
    pub timestamp: DateTime<Utc>,

    /// Opening price.
    pub open: f64,

    /// Highest price during the bar interval.
    pub high: f64,

    /// Lowest price during the bar interval.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Volume traded during the bar interval.
    pub volume: f64,

    /// Trade count for the bar. Not all providers supply this.
    pub trade_count: Option<u64>,

    /// Vendor-computed volume-weighted average price. Not all providers supply this,
    /// and the indicator engine computes its own.
    pub vwap: Option<f64>,
}

impl Bar {
    /// Pins the bar to the calendar date it belongs to on the given exchange.
    pub fn to_daily(&self, exchange_tz: Tz) -> DailyBar {
        DailyBar {
            date: tz::exchange_date(self.timestamp, exchange_tz),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// One trading day of OHLCV data keyed by a timezone-naive exchange date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// Exchange calendar date.
    pub date: NaiveDate,
    /// Opening price.
    pub open: f64,
    /// Highest price of the day.
    pub high: f64,
    /// Lowest price of the day.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Shares traded.
    pub volume: f64,
}

impl DailyBar {
    /// Typical price `(low + close + high) / 3`.
    pub fn typical_price(&self) -> f64 {
        (self.low + self.close + self.high) / 3.0
    }
}
