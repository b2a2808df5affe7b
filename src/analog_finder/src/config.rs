//! Application configuration: parsing, normalization, and loading.
//!
//! The configuration is a small TOML file; every key is optional:
//!
//! ```toml
//! database_url = "data/bars.db"
//! provider = "alpaca"
//!
//! [universe]
//! tickers = ["AAPL", "msft ", "AAPL"]   # -> ["AAPL", "MSFT"]
//!
//! [ingest]
//! batch_size = 10
//! batch_pause_secs = 5
//! start = "2015-01-01"
//! # end defaults to today
//! update_lookback_days = 7
//!
//! [search]
//! exclusion_days = 365
//! include_same_day = false
//! cache_ttl_secs = 300
//! comparison_window_days = 30
//! # limit = 50
//! ```
//!
//! Entrypoints:
//! - Parse + normalize + validate from a TOML string: [`load_config_str`]
//! - Same from a file path: [`load_config_path`]
//!
//! `DATABASE_URL` in the environment overrides `database_url`; that is applied by
//! [`AppConfig::apply_env`] so tests can parse without touching the environment.

use std::{path::Path, time::Duration};

use anyhow::{Context, bail};
use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use shared_utils::env::get_env_var_opt;

use crate::{
    ingest::{DEFAULT_BATCH_PAUSE, DEFAULT_BATCH_SIZE, DEFAULT_UPDATE_LOOKBACK_DAYS, IngestOptions},
    providers::ProviderId,
    search::{DEFAULT_COMPARISON_WINDOW_DAYS, DEFAULT_EXCLUSION_DAYS, SearchOptions},
};

/// Default database location when neither the file nor the environment sets one.
pub const DEFAULT_DATABASE_URL: &str = "stock_data.db";

/// Upper bound for every day-count setting (about a century).
pub const MAX_DAY_SPAN: u32 = 36_600;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    pub database_url: String,
    pub provider: ProviderId,
    pub universe: UniverseCfg,
    pub ingest: IngestCfg,
    pub search: SearchCfg,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            provider: ProviderId::Alpaca,
            universe: UniverseCfg::default(),
            ingest: IngestCfg::default(),
            search: SearchCfg::default(),
        }
    }
}

/// Tickers an ingestion run covers when none are given explicitly.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct UniverseCfg {
    pub tickers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct IngestCfg {
    pub batch_size: usize,
    pub batch_pause_secs: u64,
    /// First date of a full ingestion run.
    pub start: NaiveDate,
    /// Last date of a full ingestion run; today when absent.
    pub end: Option<NaiveDate>,
    pub update_lookback_days: u32,
}

impl Default for IngestCfg {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause_secs: DEFAULT_BATCH_PAUSE.as_secs(),
            start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or(NaiveDate::MIN),
            end: None,
            update_lookback_days: DEFAULT_UPDATE_LOOKBACK_DAYS,
        }
    }
}

impl IngestCfg {
    pub fn options(&self) -> IngestOptions {
        IngestOptions {
            batch_size: self.batch_size,
            batch_pause: Duration::from_secs(self.batch_pause_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct SearchCfg {
    pub exclusion_days: u32,
    pub include_same_day: bool,
    pub cache_ttl_secs: u64,
    pub comparison_window_days: u32,
    pub limit: Option<usize>,
}

impl Default for SearchCfg {
    fn default() -> Self {
        Self {
            exclusion_days: DEFAULT_EXCLUSION_DAYS,
            include_same_day: false,
            cache_ttl_secs: 300,
            comparison_window_days: DEFAULT_COMPARISON_WINDOW_DAYS,
            limit: None,
        }
    }
}

impl SearchCfg {
    pub fn options(&self) -> SearchOptions {
        SearchOptions {
            exclusion_days: self.exclusion_days,
            include_same_day: self.include_same_day,
            limit: self.limit,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl AppConfig {
    /// Trims, upper-cases and de-duplicates the ticker universe, keeping order.
    ///
    /// Returns the number of entries dropped.
    pub fn normalize(&mut self) -> usize {
        let before = self.universe.tickers.len();
        let unique: IndexSet<String> = self
            .universe
            .tickers
            .iter()
            .map(|t| t.trim().to_ascii_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        self.universe.tickers = unique.into_iter().collect();
        before - self.universe.tickers.len()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.trim().is_empty() {
            bail!("database_url must not be empty");
        }
        if self.ingest.batch_size == 0 {
            bail!("ingest.batch_size must be at least 1");
        }
        if let Some(end) = self.ingest.end {
            if end < self.ingest.start {
                bail!(
                    "ingest.end ({end}) is before ingest.start ({})",
                    self.ingest.start
                );
            }
        }
        for (key, days) in [
            ("ingest.update_lookback_days", self.ingest.update_lookback_days),
            ("search.exclusion_days", self.search.exclusion_days),
            ("search.comparison_window_days", self.search.comparison_window_days),
        ] {
            if days > MAX_DAY_SPAN {
                bail!("{key} = {days} exceeds the maximum of {MAX_DAY_SPAN} days");
            }
        }
        if self.search.limit == Some(0) {
            bail!("search.limit must be at least 1 when set");
        }
        Ok(())
    }

    /// Lets `DATABASE_URL` override the configured database.
    pub fn apply_env(&mut self) {
        if let Some(url) = get_env_var_opt("DATABASE_URL") {
            self.database_url = url;
        }
    }
}

/// Parse, normalize and validate a configuration from TOML text.
pub fn load_config_str(s: &str) -> anyhow::Result<AppConfig> {
    let mut cfg: AppConfig = toml::from_str(s).context("parsing configuration TOML")?;
    let dropped = cfg.normalize();
    if dropped > 0 {
        tracing::debug!(dropped, "dropped blank or duplicate tickers from universe");
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Read a configuration file, then [`load_config_str`].
pub fn load_config_path(path: impl AsRef<Path>) -> anyhow::Result<AppConfig> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading configuration {}", path.display()))?;
    load_config_str(&s).with_context(|| format!("loading configuration {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = load_config_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.ingest.options(), IngestOptions::default());
        assert_eq!(cfg.search.options(), SearchOptions::default());
        assert_eq!(cfg.search.cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn full_file_parses_and_normalizes() {
        let cfg = load_config_str(
            r#"
            database_url = "sqlite://bars.db"
            provider = "alpaca"

            [universe]
            tickers = [" aapl", "MSFT", "AAPL", "", "goog "]

            [ingest]
            batch_size = 3
            batch_pause_secs = 1
            start = "2020-01-01"
            end = "2020-12-31"
            update_lookback_days = 14

            [search]
            exclusion_days = 30
            include_same_day = true
            cache_ttl_secs = 60
            comparison_window_days = 10
            limit = 25
            "#,
        )
        .unwrap();

        assert_eq!(cfg.universe.tickers, ["AAPL", "MSFT", "GOOG"]);
        assert_eq!(cfg.ingest.batch_size, 3);
        assert_eq!(cfg.ingest.end, NaiveDate::from_ymd_opt(2020, 12, 31));
        assert_eq!(
            cfg.search.options(),
            SearchOptions {
                exclusion_days: 30,
                include_same_day: true,
                limit: Some(25),
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = load_config_str("[search]\nthreshold = 0.8\n").unwrap_err();
        assert!(format!("{err:#}").contains("threshold"));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = load_config_str("[ingest]\nbatch_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn inverted_ingest_range_is_rejected() {
        let err =
            load_config_str("[ingest]\nstart = \"2021-01-01\"\nend = \"2020-01-01\"\n").unwrap_err();
        assert!(err.to_string().contains("before"));
    }

    #[test]
    fn oversized_day_counts_are_rejected() {
        for toml in [
            "[search]\nexclusion_days = 4294967295\n",
            "[search]\ncomparison_window_days = 36601\n",
            "[ingest]\nupdate_lookback_days = 100000\n",
        ] {
            let err = load_config_str(toml).unwrap_err();
            assert!(err.to_string().contains("exceeds the maximum"), "{toml}: {err:#}");
        }

        let at_limit = load_config_str("[search]\nexclusion_days = 36600\n").unwrap();
        assert_eq!(at_limit.search.exclusion_days, MAX_DAY_SPAN);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!(load_config_str("provider = \"polygon\"\n").is_err());
    }

    #[test]
    fn load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analog.toml");
        std::fs::write(&path, "[universe]\ntickers = [\"spy\"]\n").unwrap();

        let cfg = load_config_path(&path).unwrap();
        assert_eq!(cfg.universe.tickers, ["SPY"]);

        let missing = load_config_path(dir.path().join("nope.toml")).unwrap_err();
        assert!(format!("{missing:#}").contains("nope.toml"));
    }
}
