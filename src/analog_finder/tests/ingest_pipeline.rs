use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use analog_finder::{
    ingest::{IngestError, IngestOptions, Ingestor, TickerOutcome},
    store::{BarQuery, BarReader},
};
use common::{FakeProvider, aapl_msft_provider, d, flat_bars};
use market_data_ingestor::{
    models::{bar::Bar, bar_series::BarSeries, request_params::DailyBarsRequest},
    providers::{DataProvider, ProviderError},
};

mod common;

fn no_pause() -> IngestOptions {
    IngestOptions {
        batch_size: 10,
        batch_pause: Duration::ZERO,
    }
}

#[test]
fn ingest_writes_annotated_bars() {
    let (_db, store) = common::setup_store();
    let provider = aapl_msft_provider();
    let ingestor = Ingestor::new(&store, &provider, no_pause());

    let report = ingestor
        .ingest(["AAPL", "MSFT"], d(2023, 1, 1), d(2023, 1, 5))
        .unwrap();

    assert_eq!(report.bars_written(), 10);
    assert_eq!(
        report.outcomes["AAPL"],
        TickerOutcome::Loaded {
            bars: 5,
            first: d(2023, 1, 1),
            last: d(2023, 1, 5),
        }
    );

    let aapl = store.query(&BarQuery::ticker("AAPL")).unwrap();
    assert_eq!(aapl.len(), 5);
    let last = &aapl[4];
    assert_eq!(last.close, 14.0);
    assert_eq!(last.vwap, Some(12.0));
    assert_eq!(last.ma_9, None);
    assert_eq!(last.rsi, None);
}

#[test]
fn re_ingestion_is_idempotent() {
    let (_db, store) = common::setup_store();
    let provider = aapl_msft_provider();
    let ingestor = Ingestor::new(&store, &provider, no_pause());

    ingestor
        .ingest(["AAPL", "MSFT"], d(2023, 1, 1), d(2023, 1, 5))
        .unwrap();
    let first = store.query(&BarQuery::all()).unwrap();

    ingestor
        .ingest(["AAPL", "MSFT"], d(2023, 1, 1), d(2023, 1, 5))
        .unwrap();
    let second = store.query(&BarQuery::all()).unwrap();

    assert_eq!(store.count(None).unwrap(), 10);
    assert_eq!(first, second);
}

#[test]
fn empty_series_is_skipped_without_error() {
    let (_db, store) = common::setup_store();
    let provider = FakeProvider::new();
    let ingestor = Ingestor::new(&store, &provider, no_pause());

    let report = ingestor
        .ingest(["ZZZZ"], d(2023, 1, 1), d(2023, 1, 5))
        .unwrap();

    assert_eq!(report.outcomes["ZZZZ"], TickerOutcome::Skipped);
    assert_eq!(store.count(Some("ZZZZ")).unwrap(), 0);
}

#[test]
fn bars_outside_the_range_count_as_no_data() {
    let (_db, store) = common::setup_store();
    // provider ignores the requested range and returns last year's bars
    struct Stale(Vec<Bar>);
    impl DataProvider for Stale {
        fn fetch_daily_bars(&self, request: &DailyBarsRequest) -> Result<BarSeries, ProviderError> {
            Ok(BarSeries::new(request.symbol.clone(), self.0.clone()))
        }
    }

    let provider = Stale(flat_bars(d(2022, 1, 3), &[1.0, 2.0], 10.0));
    let report = Ingestor::new(&store, provider, no_pause())
        .ingest(["OLD"], d(2023, 1, 1), d(2023, 1, 5))
        .unwrap();

    assert_eq!(report.outcomes["OLD"], TickerOutcome::Skipped);
    assert_eq!(store.count(None).unwrap(), 0);
}

#[test]
fn one_failing_ticker_does_not_stop_the_run() {
    let (_db, store) = common::setup_store();
    let provider = aapl_msft_provider().failing("BROKEN");
    let ingestor = Ingestor::new(&store, &provider, no_pause());

    let report = ingestor
        .ingest(["AAPL", "BROKEN", "MSFT"], d(2023, 1, 1), d(2023, 1, 5))
        .unwrap();

    assert_eq!(report.loaded().collect::<Vec<_>>(), ["AAPL", "MSFT"]);
    assert_eq!(report.failed().collect::<Vec<_>>(), ["BROKEN"]);
    assert!(matches!(&report.outcomes["BROKEN"], TickerOutcome::Failed(msg) if msg.contains("500")));
    assert_eq!(store.count(Some("BROKEN")).unwrap(), 0);
    assert_eq!(store.count(None).unwrap(), 10);
}

#[test]
fn batches_are_paced_but_not_after_the_last() {
    let (_db, store) = common::setup_store();
    let provider = FakeProvider::new();
    let pauses = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&pauses);

    let options = IngestOptions {
        batch_size: 2,
        batch_pause: Duration::from_secs(5),
    };
    let ingestor = Ingestor::new(&store, &provider, options)
        .with_sleeper(move |pause| recorded.lock().unwrap().push(pause));

    ingestor
        .ingest(["A", "B", "C", "D", "E"], d(2023, 1, 1), d(2023, 1, 5))
        .unwrap();

    // 3 batches: [A, B] [C, D] [E]
    assert_eq!(*pauses.lock().unwrap(), [Duration::from_secs(5); 2]);
    assert_eq!(provider.requested(), ["A", "B", "C", "D", "E"]);
}

#[test]
fn tickers_are_normalized_before_fetching() {
    let (_db, store) = common::setup_store();
    let provider = aapl_msft_provider();
    let ingestor = Ingestor::new(&store, &provider, no_pause());

    let report = ingestor
        .ingest([" AAPL ", "", "AAPL", "MSFT"], d(2023, 1, 1), d(2023, 1, 5))
        .unwrap();

    assert_eq!(provider.requested(), ["AAPL", "MSFT"]);
    assert_eq!(report.outcomes.len(), 2);
}

#[test]
fn inverted_range_is_rejected_before_any_fetch() {
    let (_db, store) = common::setup_store();
    let provider = aapl_msft_provider();
    let ingestor = Ingestor::new(&store, &provider, no_pause());

    let err = ingestor
        .ingest(["AAPL"], d(2023, 1, 5), d(2023, 1, 1))
        .unwrap_err();

    assert!(matches!(err, IngestError::InvalidRange { .. }));
    assert!(provider.requested().is_empty());
}

#[test]
fn vwap_restarts_with_each_ingestion_window() {
    let (_db, store) = common::setup_store();
    let provider = aapl_msft_provider();
    let ingestor = Ingestor::new(&store, &provider, no_pause());

    ingestor
        .ingest(["AAPL"], d(2023, 1, 1), d(2023, 1, 5))
        .unwrap();
    assert_eq!(store.get("AAPL", d(2023, 1, 5)).unwrap().unwrap().vwap, Some(12.0));

    ingestor
        .ingest(["AAPL"], d(2023, 1, 4), d(2023, 1, 5))
        .unwrap();
    assert_eq!(store.get("AAPL", d(2023, 1, 5)).unwrap().unwrap().vwap, Some(13.5));
    // rows outside the second window are untouched
    assert_eq!(store.get("AAPL", d(2023, 1, 1)).unwrap().unwrap().vwap, Some(10.0));
    assert_eq!(store.count(Some("AAPL")).unwrap(), 5);
}

#[test]
fn moving_averages_warm_up_through_the_pipeline() {
    let (_db, store) = common::setup_store();
    let closes: Vec<f64> = (1..=30).map(f64::from).collect();
    let provider = FakeProvider::new().with_bars("SPY", flat_bars(d(2023, 3, 1), &closes, 50.0));

    Ingestor::new(&store, &provider, no_pause())
        .ingest(["SPY"], d(2023, 3, 1), d(2023, 3, 30))
        .unwrap();

    let bars = store.query(&BarQuery::ticker("SPY")).unwrap();
    assert_eq!(bars.len(), 30);
    for (i, bar) in bars.iter().enumerate() {
        assert_eq!(bar.ma_9.is_some(), i >= 8);
        assert_eq!(bar.ma_20.is_some(), i >= 19);
        assert!(bar.ma_50.is_none());
        assert!(bar.ma_200.is_none());
        // strictly rising closes: no losses once defined
        assert_eq!(bar.rsi, (i >= 13).then_some(100.0));
    }
    assert_eq!(bars[19].ma_20, Some(10.5));
}

#[test]
fn update_fetches_the_trailing_window() {
    let (_db, store) = common::setup_store();
    let provider = aapl_msft_provider();
    let ingestor = Ingestor::new(&store, &provider, no_pause());

    let report = ingestor.update(["AAPL"], 7, d(2023, 1, 8)).unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!((requests[0].start, requests[0].end), (d(2023, 1, 1), d(2023, 1, 8)));
    assert_eq!((report.start, report.end), (d(2023, 1, 1), d(2023, 1, 8)));
    assert_eq!(store.count(Some("AAPL")).unwrap(), 5);
}

#[test]
fn update_lookback_past_the_calendar_start_is_rejected() {
    let (_db, store) = common::setup_store();
    let provider = aapl_msft_provider();
    let ingestor = Ingestor::new(&store, &provider, no_pause());

    let err = ingestor.update(["AAPL"], u32::MAX, d(2023, 1, 8)).unwrap_err();

    assert!(matches!(
        err,
        IngestError::LookbackOutOfRange { lookback_days: u32::MAX, .. }
    ));
    assert!(provider.requested().is_empty());
}

#[test]
fn write_failure_mid_series_rolls_back_only_that_ticker() {
    let (_db, store) = common::setup_store();
    // third bar has no usable close; SQLite stores NaN as NULL and rejects the row
    let mut broken = flat_bars(d(2023, 1, 1), &[10.0, 11.0, 12.0, 13.0, 14.0], 100.0);
    broken[2].close = f64::NAN;
    let provider = aapl_msft_provider().with_bars("NANX", broken);
    let ingestor = Ingestor::new(&store, &provider, no_pause());

    let report = ingestor
        .ingest(["NANX", "AAPL"], d(2023, 1, 1), d(2023, 1, 5))
        .unwrap();

    assert!(
        matches!(&report.outcomes["NANX"], TickerOutcome::Failed(msg) if msg.contains("write failed")),
        "{:?}",
        report.outcomes["NANX"]
    );
    assert_eq!(store.count(Some("NANX")).unwrap(), 0, "first two bars must be rolled back");
    assert_eq!(report.loaded().collect::<Vec<_>>(), ["AAPL"]);
    assert_eq!(store.count(Some("AAPL")).unwrap(), 5);
}
