//! SQLite connection helpers.
//!
//! Provides [`connect_sqlite`] that opens a connection and applies the PRAGMAs every
//! reader and writer relies on: a 5000ms busy_timeout, WAL journaling (readers keep
//! working while an ingestion run holds the write lock) and foreign_keys=ON.
//!
//! Example:
//! ```no_run
//! use analog_finder::db::connection::connect_sqlite;
//!
//! let path = std::env::temp_dir().join("analog_finder_example.db");
//! let _conn = connect_sqlite(path.to_str().unwrap()).expect("open sqlite");
//! ```

use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};

use crate::store::StoreError;

/// Strips an optional `sqlite://` or `sqlite:` scheme so URLs and bare paths both work.
pub fn sqlite_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

/// Open a SQLite connection and apply connection-wide PRAGMAs.
pub fn connect_sqlite(database_url: &str) -> Result<SqliteConnection, StoreError> {
    let path = sqlite_path(database_url);
    let mut conn = SqliteConnection::establish(path).map_err(|source| StoreError::Connection {
        url: database_url.to_owned(),
        source,
    })?;

    // busy_timeout first so switching to WAL waits on a concurrent writer
    sql_query("PRAGMA busy_timeout=5000;").execute(&mut conn)?;
    sql_query("PRAGMA journal_mode=WAL;").execute(&mut conn)?;
    sql_query("PRAGMA foreign_keys=ON;").execute(&mut conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_prefixes_are_stripped() {
        assert_eq!(sqlite_path("sqlite://data/bars.db"), "data/bars.db");
        assert_eq!(sqlite_path("sqlite:bars.db"), "bars.db");
        assert_eq!(sqlite_path("/tmp/bars.db"), "/tmp/bars.db");
        assert_eq!(sqlite_path(":memory:"), ":memory:");
    }
}
