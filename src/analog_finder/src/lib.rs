//! Analogous-history finder.
//!
//! Daily bars of a ticker universe are fetched from a market-data provider,
//! annotated with technical indicators and kept in SQLite ([`ingest`], [`store`]).
//! [`search`] then finds past market states, across all tickers, whose indicator
//! profile resembles a given ticker on a given date.
//!
//! Around that core:
//! - [`cache`] memoizes search results for a fixed time-to-live,
//! - [`dispatch`] runs searches and ingestion runs on a bounded background pool,
//! - [`config`] loads the TOML configuration used by the `analog-finder` binary.

pub mod cache;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod ingest;
pub mod models;
pub mod providers;
pub mod schema;
pub mod search;
pub mod store;
