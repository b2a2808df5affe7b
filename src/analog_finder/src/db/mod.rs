//! Database utilities for connections and schema migrations.
//!
//! This module provides:
//! - SQLite connection helpers: [`connection::connect_sqlite`] applies WAL, foreign_keys=ON, and a 5000ms busy_timeout.
//! - Embedded Diesel migrations: [`migrate::run_sqlite`] brings a database file up to date.
//!
//! Example:
//! ```no_run
//! use analog_finder::db::{connection, migrate};
//!
//! let db_path = std::env::temp_dir().join("analog_finder_example.db");
//! migrate::run_sqlite(db_path.to_str().unwrap()).expect("migrations");
//!
//! let _conn = connection::connect_sqlite(db_path.to_str().unwrap()).expect("connect");
//! ```
//!
//! The `sqlite` feature of diesel links against a bundled SQLite (via `libsqlite3-sys`),
//! so no system library is needed.

pub mod connection;
pub mod migrate;
