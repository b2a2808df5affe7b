//! Ingestion pipeline: provider -> indicator engine -> bar store.
//!
//! An [`Ingestor`] walks a ticker list in fixed-size batches, pausing between
//! batches to stay under the provider's rate limit. Each ticker is fetched,
//! normalized to exchange dates, annotated with indicators and upserted in its
//! own transaction, so one bad ticker never affects the others.
//!
//! The whole run holds the store's writer lock; concurrent runs queue up behind it.

use std::{fmt, time::Duration};

use chrono::{Days, NaiveDate};
use indexmap::{IndexMap, IndexSet};
use market_data_ingestor::{
    indicators,
    models::request_params::DailyBarsRequest,
    providers::{DataProvider, ProviderError},
    tz::EXCHANGE_TZ,
};
use tracing::{debug, info, warn};

use crate::store::{BarWriter, SqliteBarStore, StoreError};

/// Tickers per batch when not configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Pause between two batches when not configured otherwise.
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_secs(5);
/// Look-back of an update run, in calendar days.
pub const DEFAULT_UPDATE_LOOKBACK_DAYS: u32 = 7;

/// Batching knobs of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Tickers fetched back to back before pausing. Zero is treated as one.
    pub batch_size: usize,
    /// Blocking pause between batches; none after the last batch.
    pub batch_pause: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: DEFAULT_BATCH_PAUSE,
        }
    }
}

/// Errors that abort a whole run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("look-back of {lookback_days} days from {today} is outside the calendar")]
    LookbackOutOfRange { lookback_days: u32, today: NaiveDate },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a single ticker produced no rows.
#[derive(Debug, thiserror::Error)]
pub enum TickerError {
    #[error("no data returned for the requested range")]
    DataUnavailable,
    #[error("provider failure: {0}")]
    Provider(#[from] ProviderError),
    #[error("write failed: {0}")]
    Store(#[from] StoreError),
}

/// What happened to one ticker during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum TickerOutcome {
    /// Bars were written.
    Loaded {
        bars: usize,
        first: NaiveDate,
        last: NaiveDate,
    },
    /// The provider had nothing for the range.
    Skipped,
    /// Fetching or writing failed; nothing of this ticker was written.
    Failed(String),
}

/// Per-ticker outcomes of a run, in processing order.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub outcomes: IndexMap<String, TickerOutcome>,
}

impl IngestReport {
    fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            outcomes: IndexMap::new(),
        }
    }

    /// Total number of bars written.
    pub fn bars_written(&self) -> usize {
        self.outcomes
            .values()
            .map(|o| match o {
                TickerOutcome::Loaded { bars, .. } => *bars,
                _ => 0,
            })
            .sum()
    }

    pub fn loaded(&self) -> impl Iterator<Item = &str> {
        self.tickers_where(|o| matches!(o, TickerOutcome::Loaded { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.tickers_where(|o| matches!(o, TickerOutcome::Skipped))
    }

    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.tickers_where(|o| matches!(o, TickerOutcome::Failed(_)))
    }

    fn tickers_where(&self, pred: fn(&TickerOutcome) -> bool) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(move |(_, o)| pred(o))
            .map(|(t, _)| t.as_str())
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..={}: {} loaded ({} bars), {} skipped, {} failed",
            self.start,
            self.end,
            self.loaded().count(),
            self.bars_written(),
            self.skipped().count(),
            self.failed().count(),
        )
    }
}

/// Trims tickers, drops blanks and duplicates, keeping first-seen order.
pub fn normalize_tickers<I, S>(tickers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tickers
        .into_iter()
        .map(|t| t.as_ref().trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

type Sleeper<'s> = Box<dyn Fn(Duration) + Send + Sync + 's>;

/// Runs ingestion for one provider into one store.
pub struct Ingestor<'s, P> {
    store: &'s SqliteBarStore,
    provider: P,
    options: IngestOptions,
    sleep: Sleeper<'s>,
}

impl<'s, P: DataProvider> Ingestor<'s, P> {
    pub fn new(store: &'s SqliteBarStore, provider: P, options: IngestOptions) -> Self {
        Self {
            store,
            provider,
            options,
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replaces the function used to pause between batches.
    pub fn with_sleeper(mut self, sleep: impl Fn(Duration) + Send + Sync + 's) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    /// Fetches, annotates and upserts `[start, end]` for every ticker.
    ///
    /// Per-ticker problems are reported in the [`IngestReport`]; only an invalid
    /// range or a store that cannot be opened for writing fail the run.
    pub fn ingest<I, S>(
        &self,
        tickers: I,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<IngestReport, IngestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if start > end {
            return Err(IngestError::InvalidRange { start, end });
        }

        let tickers = normalize_tickers(tickers);
        let mut report = IngestReport::new(start, end);
        if tickers.is_empty() {
            return Ok(report);
        }

        let mut writer = self.store.writer()?;
        let batch_size = self.options.batch_size.max(1);

        for (i, batch) in tickers.chunks(batch_size).enumerate() {
            if i > 0 {
                debug!(pause = ?self.options.batch_pause, batch = i, "pausing between batches");
                (self.sleep)(self.options.batch_pause);
            }

            for ticker in batch {
                let outcome = match self.ingest_ticker(&mut writer, ticker, start, end) {
                    Ok(outcome) => outcome,
                    Err(TickerError::DataUnavailable) => {
                        warn!(ticker = %ticker, %start, %end, "no data available, skipping");
                        TickerOutcome::Skipped
                    }
                    Err(e) => {
                        warn!(ticker = %ticker, error = %e, "ticker failed");
                        TickerOutcome::Failed(e.to_string())
                    }
                };
                report.outcomes.insert(ticker.clone(), outcome);
            }
        }

        info!(%report, "ingestion finished");
        Ok(report)
    }

    /// Refreshes the trailing `lookback_days` up to and including `today`.
    pub fn update<I, S>(
        &self,
        tickers: I,
        lookback_days: u32,
        today: NaiveDate,
    ) -> Result<IngestReport, IngestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let start = today
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .ok_or(IngestError::LookbackOutOfRange {
                lookback_days,
                today,
            })?;
        self.ingest(tickers, start, today)
    }

    fn ingest_ticker(
        &self,
        writer: &mut BarWriter<'_>,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TickerOutcome, TickerError> {
        let request = DailyBarsRequest::new(ticker, start, end);
        let series = self.provider.fetch_daily_bars(&request)?;

        let daily = series.to_daily(EXCHANGE_TZ, start, end);
        let (Some(first), Some(last)) = (daily.first(), daily.last()) else {
            return Err(TickerError::DataUnavailable);
        };
        let (first, last) = (first.date, last.date);

        let annotated = indicators::compute(&daily);
        writer.upsert_ticker(ticker, &annotated)?;

        info!(ticker = %ticker, %first, %last, bars = annotated.len(), "loaded");
        Ok(TickerOutcome::Loaded {
            bars: annotated.len(),
            first,
            last,
        })
    }
}
