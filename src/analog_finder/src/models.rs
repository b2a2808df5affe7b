//! Diesel models mapping to the database schema.
//!
//! These types mirror [`crate::schema::stock_bars`] for use with Diesel's
//! Queryable/Insertable APIs:
//! - [`StoredBar`]: a row as read back, with its indicators exposed as an
//!   [`IndicatorVector`].
//! - [`NewStoredBar`]: the insert/upsert form built from an annotated bar.

use chrono::NaiveDate;
use diesel::prelude::*;
use market_data_ingestor::{
    indicators::{IndicatorBar, IndicatorVector},
    models::bar::DailyBar,
};
use serde::Serialize;

use crate::schema::stock_bars;

/// A row in [`crate::schema::stock_bars`]: one ticker on one exchange date.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = stock_bars, check_for_backend(diesel::sqlite::Sqlite))]
pub struct StoredBar {
    /// Database primary key (SQLite rowid).
    #[serde(skip)]
    pub id: i32,
    /// Ticker symbol (e.g., "AAPL").
    pub ticker: String,
    /// Exchange calendar date of the bar.
    pub date: NaiveDate,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
    /// 200-bar simple moving average of `close`.
    pub ma_200: Option<f64>,
    /// 50-bar simple moving average of `close`.
    pub ma_50: Option<f64>,
    /// 20-bar simple moving average of `close`.
    pub ma_20: Option<f64>,
    /// 9-bar simple moving average of `close`.
    pub ma_9: Option<f64>,
    /// 14-bar RSI.
    pub rsi: Option<f64>,
    /// Expanding VWAP from the start of the ingestion window that wrote this row.
    pub vwap: Option<f64>,
}

impl StoredBar {
    /// The indicator columns of this row.
    pub fn indicators(&self) -> IndicatorVector {
        IndicatorVector {
            ma_200: self.ma_200,
            ma_50: self.ma_50,
            ma_20: self.ma_20,
            ma_9: self.ma_9,
            rsi: self.rsi,
            vwap: self.vwap,
        }
    }

    /// The raw OHLCV columns of this row.
    pub fn daily_bar(&self) -> DailyBar {
        DailyBar {
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// Insertable and upsertable form of [`StoredBar`].
///
/// `treat_none_as_null` makes an upsert clear an indicator that is no longer
/// defined, instead of leaving the old value in place.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = stock_bars, treat_none_as_null = true)]
pub struct NewStoredBar<'a> {
    pub ticker: &'a str,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub ma_200: Option<f64>,
    pub ma_50: Option<f64>,
    pub ma_20: Option<f64>,
    pub ma_9: Option<f64>,
    pub rsi: Option<f64>,
    pub vwap: Option<f64>,
}

impl<'a> NewStoredBar<'a> {
    /// Row for `ticker` carrying the OHLCV and indicators of `bar`.
    pub fn new(ticker: &'a str, bar: &IndicatorBar) -> Self {
        let IndicatorBar { bar, indicators } = *bar;
        Self {
            ticker,
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            ma_200: indicators.ma_200,
            ma_50: indicators.ma_50,
            ma_20: indicators.ma_20,
            ma_9: indicators.ma_9,
            rsi: indicators.rsi,
            vwap: indicators.vwap,
        }
    }
}
