//! Similarity search over the whole bar history.
//!
//! Given a ticker and an as-of date, [`SimilaritySearch::search`] takes the
//! ticker's most recent bar on or before that date as the reference and scores
//! every earlier bar of every ticker against it (see [`similarity`]). The query
//! ticker's own recent past, `[as_of - exclusion_days, as_of]`, is left out so a
//! ticker does not simply match its previous few days.
//!
//! This is an exact full scan, linear in the number of stored bars.

mod score;

use std::ops::Bound;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, warn};

pub use score::{SIMILARITY_THRESHOLD, similarity};

use crate::{
    models::StoredBar,
    store::{BarQuery, BarReader, StoreError},
};

/// Default length of the query ticker's excluded trailing window, in days.
pub const DEFAULT_EXCLUSION_DAYS: u32 = 365;

/// Default half-width of a comparison window, in days.
pub const DEFAULT_COMPARISON_WINDOW_DAYS: u32 = 30;

/// Tuning of a [`SimilaritySearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Days before the as-of date in which the query ticker's own bars are ignored.
    pub exclusion_days: u32,
    /// Whether other tickers' bars dated on the as-of date itself are candidates.
    /// Off by default: only strictly earlier bars are.
    pub include_same_day: bool,
    /// Keep at most this many matches after ranking.
    pub limit: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            exclusion_days: DEFAULT_EXCLUSION_DAYS,
            include_same_day: false,
            limit: None,
        }
    }
}

/// A historical bar whose indicators resemble the reference bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMatch {
    pub date: NaiveDate,
    pub ticker: String,
    pub score: f64,
}

/// Lookups that need at least one stored bar.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("no bar for {ticker} on or before {as_of}")]
    NoBarOnOrBefore { ticker: String, as_of: NaiveDate },
    #[error("no bars stored for {ticker}")]
    UnknownTicker { ticker: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LookupError {
    /// Whether the lookup failed for lack of data rather than a store problem.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoBarOnOrBefore { .. } | Self::UnknownTicker { .. }
        )
    }
}

/// Bars around a query date and around one of its matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonWindow {
    pub query: Vec<StoredBar>,
    pub matched: Vec<StoredBar>,
}

/// Search engine over any [`BarReader`].
#[derive(Debug, Clone)]
pub struct SimilaritySearch<R> {
    reader: R,
    options: SearchOptions,
}

impl<R: BarReader> SimilaritySearch<R> {
    pub fn new(reader: R, options: SearchOptions) -> Self {
        Self { reader, options }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Ranks historical bars by closeness to `ticker` as of `as_of`.
    ///
    /// Only matches scoring above [`SIMILARITY_THRESHOLD`] are returned, ordered by
    /// score descending, then ticker and date ascending.
    pub fn search(&self, ticker: &str, as_of: NaiveDate) -> Result<Vec<SimilarityMatch>, LookupError> {
        let reference = self
            .reader
            .latest_on_or_before(ticker, as_of)?
            .ok_or_else(|| LookupError::NoBarOnOrBefore {
                ticker: ticker.to_owned(),
                as_of,
            })?;
        let reference_vector = reference.indicators();

        let cutoff = if self.options.include_same_day {
            Bound::Included(as_of)
        } else {
            Bound::Excluded(as_of)
        };
        let candidates = self.reader.query(&BarQuery::all().upper(cutoff))?;
        let scanned = candidates.len();

        // a window reaching past the calendar's start excludes all earlier history
        let excluded_from = as_of
            .checked_sub_days(Days::new(u64::from(self.options.exclusion_days)))
            .unwrap_or(NaiveDate::MIN);
        let is_excluded =
            |bar: &StoredBar| bar.ticker == ticker && (excluded_from..=as_of).contains(&bar.date);

        let mut matches: Vec<SimilarityMatch> = candidates
            .into_iter()
            .filter(|bar| !is_excluded(bar))
            .filter_map(|bar| {
                let score = similarity(&reference_vector, &bar.indicators());
                (score > SIMILARITY_THRESHOLD).then_some(SimilarityMatch {
                    date: bar.date,
                    ticker: bar.ticker,
                    score,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            score::rank(
                a.score,
                (a.ticker.as_str(), a.date),
                b.score,
                (b.ticker.as_str(), b.date),
            )
        });
        if let Some(limit) = self.options.limit {
            matches.truncate(limit);
        }

        debug!(
            ticker,
            %as_of,
            reference_date = %reference.date,
            scanned,
            matches = matches.len(),
            "similarity search done"
        );
        Ok(matches)
    }

    /// Like [`search`](Self::search), but a missing reference bar yields no matches.
    pub fn analyze(&self, ticker: &str, as_of: NaiveDate) -> Result<Vec<SimilarityMatch>, StoreError> {
        match self.search(ticker, as_of) {
            Ok(matches) => Ok(matches),
            Err(LookupError::Store(e)) => Err(e),
            Err(e) => {
                warn!(ticker, %as_of, error = %e, "nothing to analyze");
                Ok(Vec::new())
            }
        }
    }

    /// First and last stored date of `ticker`.
    pub fn available_range(&self, ticker: &str) -> Result<(NaiveDate, NaiveDate), LookupError> {
        self.reader
            .date_range(ticker)?
            .ok_or_else(|| LookupError::UnknownTicker {
                ticker: ticker.to_owned(),
            })
    }

    /// Bars of `ticker` within `window_days` of `date`, next to the bars of the
    /// matched ticker within `window_days` of the match date.
    ///
    /// A window reaching past either end of the calendar is open on that side.
    pub fn comparison_window(
        &self,
        ticker: &str,
        date: NaiveDate,
        matched: &SimilarityMatch,
        window_days: u32,
    ) -> Result<ComparisonWindow, StoreError> {
        let query = self.reader.query(&around(ticker, date, window_days))?;
        let matched = self.reader.query(&around(
            matched.ticker.as_str(),
            matched.date,
            window_days,
        ))?;
        Ok(ComparisonWindow { query, matched })
    }
}

fn around(ticker: &str, date: NaiveDate, window_days: u32) -> BarQuery {
    let w = Days::new(u64::from(window_days));
    BarQuery::ticker(ticker)
        .lower(date.checked_sub_days(w).map_or(Bound::Unbounded, Bound::Included))
        .upper(date.checked_add_days(w).map_or(Bound::Unbounded, Bound::Included))
}
