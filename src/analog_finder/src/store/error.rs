/// Errors raised by the SQLite bar store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database file could not be opened.
    #[error("failed to open database `{url}`: {source}")]
    Connection {
        /// The URL or path that was opened.
        url: String,
        /// Underlying diesel error.
        #[source]
        source: diesel::ConnectionError,
    },
    /// A statement failed (including a transaction that was rolled back).
    #[error("database query failed: {0}")]
    Query(#[from] diesel::result::Error),
    /// Embedded migrations could not be applied.
    #[error("migration failed: {0}")]
    Migration(String),
}
