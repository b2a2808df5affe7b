//! Bar store: durable daily bars keyed by (ticker, date).
//!
//! Reads go through the [`BarReader`] trait so the search engine can run against
//! anything that serves bars; [`SqliteBarStore`] is the production implementation.
//! Writes are only possible through a [`BarWriter`], which holds the store's
//! exclusive writer lock for as long as it lives.

mod error;
mod sqlite;

use std::{ops::Bound, sync::Arc};

use chrono::NaiveDate;

pub use error::StoreError;
pub use sqlite::{BarWriter, SqliteBarStore};

use crate::models::StoredBar;

/// Filter for [`BarReader::query`]: an optional ticker and date bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarQuery {
    pub ticker: Option<String>,
    pub from: Bound<NaiveDate>,
    pub to: Bound<NaiveDate>,
}

impl BarQuery {
    /// Every bar of every ticker.
    pub fn all() -> Self {
        Self {
            ticker: None,
            from: Bound::Unbounded,
            to: Bound::Unbounded,
        }
    }

    /// Every bar of `ticker`.
    pub fn ticker(ticker: impl Into<String>) -> Self {
        Self {
            ticker: Some(ticker.into()),
            ..Self::all()
        }
    }

    /// Bars of `ticker` in `[start, end]`.
    pub fn ticker_between(ticker: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self::ticker(ticker)
            .lower(Bound::Included(start))
            .upper(Bound::Included(end))
    }

    pub fn lower(mut self, bound: Bound<NaiveDate>) -> Self {
        self.from = bound;
        self
    }

    pub fn upper(mut self, bound: Bound<NaiveDate>) -> Self {
        self.to = bound;
        self
    }
}

/// Read access to stored bars.
///
/// Readers never take the writer lock and may observe an ingestion run half way
/// through (some tickers of a batch updated, others not).
pub trait BarReader {
    /// The bar of `ticker` on `date`, if stored.
    fn get(&self, ticker: &str, date: NaiveDate) -> Result<Option<StoredBar>, StoreError>;

    /// The most recent bar of `ticker` dated on or before `as_of`.
    fn latest_on_or_before(
        &self,
        ticker: &str,
        as_of: NaiveDate,
    ) -> Result<Option<StoredBar>, StoreError>;

    /// Bars matching `query`, ordered by ticker then date ascending.
    fn query(&self, query: &BarQuery) -> Result<Vec<StoredBar>, StoreError>;

    /// First and last stored date of `ticker`.
    fn date_range(&self, ticker: &str) -> Result<Option<(NaiveDate, NaiveDate)>, StoreError>;

    /// Number of stored bars, for one ticker or overall.
    fn count(&self, ticker: Option<&str>) -> Result<i64, StoreError>;
}

impl<T: BarReader + ?Sized> BarReader for &T {
    fn get(&self, ticker: &str, date: NaiveDate) -> Result<Option<StoredBar>, StoreError> {
        (**self).get(ticker, date)
    }

    fn latest_on_or_before(
        &self,
        ticker: &str,
        as_of: NaiveDate,
    ) -> Result<Option<StoredBar>, StoreError> {
        (**self).latest_on_or_before(ticker, as_of)
    }

    fn query(&self, query: &BarQuery) -> Result<Vec<StoredBar>, StoreError> {
        (**self).query(query)
    }

    fn date_range(&self, ticker: &str) -> Result<Option<(NaiveDate, NaiveDate)>, StoreError> {
        (**self).date_range(ticker)
    }

    fn count(&self, ticker: Option<&str>) -> Result<i64, StoreError> {
        (**self).count(ticker)
    }
}

impl<T: BarReader + ?Sized> BarReader for Arc<T> {
    fn get(&self, ticker: &str, date: NaiveDate) -> Result<Option<StoredBar>, StoreError> {
        (**self).get(ticker, date)
    }

    fn latest_on_or_before(
        &self,
        ticker: &str,
        as_of: NaiveDate,
    ) -> Result<Option<StoredBar>, StoreError> {
        (**self).latest_on_or_before(ticker, as_of)
    }

    fn query(&self, query: &BarQuery) -> Result<Vec<StoredBar>, StoreError> {
        (**self).query(query)
    }

    fn date_range(&self, ticker: &str) -> Result<Option<(NaiveDate, NaiveDate)>, StoreError> {
        (**self).date_range(ticker)
    }

    fn count(&self, ticker: Option<&str>) -> Result<i64, StoreError> {
        (**self).count(ticker)
    }
}
