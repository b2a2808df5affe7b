//! Embedded schema migrations.

use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::{db::connection::connect_sqlite, store::StoreError};

/// Embedded Diesel migrations bundled with this crate.
///
/// These are applied by [`run_sqlite`] to bring the database schema up to date.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs pending Diesel migrations on the SQLite database at `database_url`.
///
/// Safe to call on every start: already applied migrations are skipped.
pub fn run_sqlite(database_url: &str) -> Result<(), StoreError> {
    let mut conn = connect_sqlite(database_url)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::Migration(e.to_string()))?;

    if !applied.is_empty() {
        tracing::info!(count = applied.len(), "applied pending migrations");
    }
    Ok(())
}
