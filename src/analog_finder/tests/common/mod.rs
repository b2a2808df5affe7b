#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::Mutex,
};

use analog_finder::{db::connection, store::SqliteBarStore};
use chrono::{Duration, NaiveDate};
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use market_data_ingestor::{
    models::{bar::Bar, bar_series::BarSeries, request_params::DailyBarsRequest},
    providers::{DataProvider, ProviderError},
    tz::{EXCHANGE_TZ, local_day_start_utc},
};
use tempfile::TempDir;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}

pub struct TestDb {
    _dir: TempDir,    // keep alive for the life of the test
    pub path: String, // <tmpdir>/test.db
}

/// A migrated store in a fresh temp directory.
pub fn setup_store() -> (TestDb, SqliteBarStore) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    let store = SqliteBarStore::open(path.clone()).expect("open store");
    (TestDb { _dir: dir, path }, store)
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal"); // WAL is persistent per DB file

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

pub fn connect(db: &TestDb) -> SqliteConnection {
    connection::connect_sqlite(&db.path).expect("connect")
}

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// One bar per consecutive calendar day from `start`, stamped the way Alpaca
/// stamps daily bars (local midnight in UTC), with open = high = low = close.
pub fn flat_bars(start: NaiveDate, closes: &[f64], volume: f64) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: local_day_start_utc(start + Duration::days(i as i64), EXCHANGE_TZ),
            open: close,
            high: close,
            low: close,
            close,
            volume,
            trade_count: None,
            vwap: None,
        })
        .collect()
}

/// In-memory provider: canned bars per symbol, optional failures, a call log.
#[derive(Default)]
pub struct FakeProvider {
    bars: HashMap<String, Vec<Bar>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<DailyBarsRequest>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.bars.insert(symbol.to_owned(), bars);
        self
    }

    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_owned());
        self
    }

    /// Symbols requested so far, in call order.
    pub fn requested(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.symbol.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<DailyBarsRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl DataProvider for FakeProvider {
    fn fetch_daily_bars(&self, request: &DailyBarsRequest) -> Result<BarSeries, ProviderError> {
        self.calls.lock().unwrap().push(request.clone());

        if self.failing.contains(&request.symbol) {
            return Err(ProviderError::Api {
                status: 500,
                message: format!("upstream error for {}", request.symbol),
            });
        }

        let bars = self
            .bars
            .get(&request.symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| {
                        let date = b.timestamp.with_timezone(&EXCHANGE_TZ).date_naive();
                        request.start <= date && date <= request.end
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(BarSeries::new(request.symbol.clone(), bars))
    }
}

/// AAPL closes 10..=14 and MSFT closes 10, 11, 12, 13, 14.01 on 2023-01-01..=05,
/// volume 100 each.
pub fn aapl_msft_provider() -> FakeProvider {
    FakeProvider::new()
        .with_bars("AAPL", flat_bars(d(2023, 1, 1), &[10.0, 11.0, 12.0, 13.0, 14.0], 100.0))
        .with_bars("MSFT", flat_bars(d(2023, 1, 1), &[10.0, 11.0, 12.0, 13.0, 14.01], 100.0))
}
