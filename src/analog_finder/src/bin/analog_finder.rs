use std::{convert::Infallible, path::PathBuf, process::ExitCode, sync::Arc};

use analog_finder::{
    cache::CachedSearch,
    config::{AppConfig, MAX_DAY_SPAN, load_config_path},
    dispatch::Dispatcher,
    ingest::{IngestError, IngestReport, Ingestor},
    providers::build_provider,
    search::{LookupError, SimilarityMatch, SimilaritySearch, similarity},
    store::{BarReader, SqliteBarStore},
};
use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use market_data_ingestor::providers::DataProvider;
use tracing_subscriber::EnvFilter;

type DynIngestor<'s> = Ingestor<'s, Box<dyn DataProvider + Send + Sync>>;

/// Exit code when the requested ticker or date has no stored bars.
const EXIT_NOT_FOUND: u8 = 2;
/// Exit code when an ingestion run finished with failed tickers.
const EXIT_TICKERS_FAILED: u8 = 3;

fn day_span() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(0..=i64::from(MAX_DAY_SPAN))
}

#[derive(Parser)]
#[command(version, about = "Find past market states that resemble a ticker on a given date")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Create or upgrade the database schema.
    Migrate,
    /// Fetch and store bars for a date range.
    Ingest(IngestArgs),
    /// Refresh the most recent days of every ticker.
    Update {
        #[arg(long, value_delimiter = ',')]
        tickers: Vec<String>,
        /// Days to look back from today.
        #[arg(long, value_parser = day_span())]
        days: Option<u32>,
    },
    /// Rank past bars by similarity to a ticker on a date.
    Search(SearchArgs),
    /// Show the first and last stored date of a ticker.
    Range {
        #[arg(long)]
        ticker: String,
    },
    /// Print the bars around a query date and around a match.
    Compare {
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        match_ticker: String,
        #[arg(long)]
        match_date: NaiveDate,
        /// Half-width of each window, in days.
        #[arg(long, value_parser = day_span())]
        window: Option<u32>,
    },
}

#[derive(Args)]
struct IngestArgs {
    /// Comma separated; defaults to the configured universe.
    #[arg(long, value_delimiter = ',')]
    tickers: Vec<String>,
    #[arg(long)]
    start: Option<NaiveDate>,
    #[arg(long)]
    end: Option<NaiveDate>,
}

#[derive(Args)]
struct SearchArgs {
    #[arg(long)]
    ticker: String,
    #[arg(long)]
    date: NaiveDate,
    #[arg(long, value_parser = day_span())]
    exclusion_days: Option<u32>,
    /// Also consider other tickers' bars on the query date itself.
    #[arg(long)]
    same_day: bool,
    #[arg(long)]
    limit: Option<usize>,
    /// Print matches as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("analog_finder=info,market_data_ingestor=info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut cfg = match &cli.config {
        Some(path) => load_config_path(path)?,
        None => AppConfig::default(),
    };
    cfg.apply_env();

    let store = Arc::new(
        SqliteBarStore::open(&cfg.database_url)
            .with_context(|| format!("opening store {}", cfg.database_url))?,
    );

    match cli.cmd {
        Cmd::Migrate => {
            println!("schema up to date at {}", cfg.database_url);
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Ingest(args) => {
            let tickers = pick_tickers(args.tickers, &cfg);
            let start = args.start.unwrap_or(cfg.ingest.start);
            let end = args.end.or(cfg.ingest.end).unwrap_or_else(today);
            let report = run_ingest(&cfg, store, move |ingestor| {
                ingestor.ingest(&tickers, start, end)
            })?;
            Ok(report_exit(&report))
        }
        Cmd::Update { tickers, days } => {
            let tickers = pick_tickers(tickers, &cfg);
            let days = days.unwrap_or(cfg.ingest.update_lookback_days);
            let report = run_ingest(&cfg, store, move |ingestor| {
                ingestor.update(&tickers, days, today())
            })?;
            Ok(report_exit(&report))
        }
        Cmd::Search(args) => {
            let mut options = cfg.search.options();
            if let Some(days) = args.exclusion_days {
                options.exclusion_days = days;
            }
            options.include_same_day |= args.same_day;
            if args.limit.is_some() {
                options.limit = args.limit;
            }

            let search = CachedSearch::new(
                SimilaritySearch::new(Arc::clone(&store), options),
                cfg.search.cache_ttl(),
            );
            let ticker = args.ticker.trim().to_ascii_uppercase();
            let date = args.date;

            let runtime = tokio::runtime::Runtime::new()?;
            let dispatcher = Dispatcher::with_runtime(runtime.handle().clone(), 1);
            // the lookup error travels back whole so not-found and store
            // failures map to different exit codes
            let job = dispatcher.submit(move || Ok::<_, Infallible>(search.search(&ticker, date)));
            let id = job.id();
            tracing::debug!(%id, "search submitted");

            let outcome = runtime.block_on(job.wait())?;
            finish_search(&outcome, args.json).map(ExitCode::from)
        }
        Cmd::Range { ticker } => {
            let search = SimilaritySearch::new(Arc::clone(&store), cfg.search.options());
            let ticker = ticker.trim().to_ascii_uppercase();
            match search.available_range(&ticker) {
                Ok((first, last)) => {
                    println!("{ticker}: {first} .. {last}");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => not_found_or_err(e),
            }
        }
        Cmd::Compare {
            ticker,
            date,
            match_ticker,
            match_date,
            window,
        } => {
            let ticker = ticker.trim().to_ascii_uppercase();
            let match_ticker = match_ticker.trim().to_ascii_uppercase();
            let reference = match store.latest_on_or_before(&ticker, date)? {
                Some(bar) => bar,
                None => {
                    return not_found_or_err(LookupError::NoBarOnOrBefore { ticker, as_of: date });
                }
            };
            let score = store
                .get(&match_ticker, match_date)?
                .map_or(0.0, |bar| similarity(&reference.indicators(), &bar.indicators()));

            let search = SimilaritySearch::new(Arc::clone(&store), cfg.search.options());
            let matched = SimilarityMatch {
                date: match_date,
                ticker: match_ticker,
                score,
            };
            let window = window.unwrap_or(cfg.search.comparison_window_days);
            let cmp = search.comparison_window(&ticker, date, &matched, window)?;
            println!("score {score:.4}");
            println!("{}", serde_json::to_string_pretty(&cmp)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn pick_tickers(explicit: Vec<String>, cfg: &AppConfig) -> Vec<String> {
    if explicit.is_empty() {
        cfg.universe.tickers.clone()
    } else {
        explicit.iter().map(|t| t.trim().to_ascii_uppercase()).collect()
    }
}

/// Runs an ingestion job on the background pool and waits for its report.
fn run_ingest<F>(cfg: &AppConfig, store: Arc<SqliteBarStore>, job: F) -> Result<Arc<IngestReport>>
where
    F: FnOnce(&DynIngestor<'_>) -> Result<IngestReport, IngestError> + Send + 'static,
{
    let provider_id = cfg.provider;
    let options = cfg.ingest.options();

    let runtime = tokio::runtime::Runtime::new()?;
    let dispatcher = Dispatcher::with_runtime(runtime.handle().clone(), 1);
    let handle = dispatcher.submit(move || -> Result<IngestReport> {
        let provider = build_provider(provider_id)?;
        let ingestor = Ingestor::new(&store, provider, options);
        Ok(job(&ingestor)?)
    });

    let report = runtime.block_on(handle.wait())?;
    println!("{report}");
    Ok(report)
}

fn report_exit(report: &IngestReport) -> ExitCode {
    if report.failed().next().is_some() {
        ExitCode::from(EXIT_TICKERS_FAILED)
    } else {
        ExitCode::SUCCESS
    }
}

fn print_matches(matches: &[SimilarityMatch], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(matches)?);
        return Ok(());
    }
    if matches.is_empty() {
        println!("no similar market states found");
    }
    for m in matches {
        println!("{:<8} {}  {:.4}", m.ticker, m.date, m.score);
    }
    Ok(())
}

/// Prints a finished search and picks the exit code; store failures are errors.
fn finish_search(
    outcome: &Result<Arc<Vec<SimilarityMatch>>, LookupError>,
    json: bool,
) -> Result<u8> {
    match outcome {
        Ok(matches) => {
            print_matches(matches, json)?;
            Ok(0)
        }
        Err(e) if e.is_not_found() => {
            eprintln!("{e}");
            Ok(EXIT_NOT_FOUND)
        }
        Err(e) => Err(anyhow!("search failed: {e}")),
    }
}

fn not_found_or_err(e: LookupError) -> Result<ExitCode> {
    if e.is_not_found() {
        eprintln!("{e}");
        Ok(ExitCode::from(EXIT_NOT_FOUND))
    } else {
        Err(e.into())
    }
}
