use std::{
    ops::Bound,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::NaiveDate;
use diesel::{
    SqliteConnection,
    dsl::{count_star, max, min},
    prelude::*,
};
use market_data_ingestor::indicators::IndicatorBar;

use super::{BarQuery, BarReader, StoreError};
use crate::{
    db::{connection::connect_sqlite, migrate},
    models::{NewStoredBar, StoredBar},
    schema::stock_bars::dsl as sb,
};

/// SQLite-backed bar store.
///
/// Every read opens its own connection, so the store can be shared freely across
/// threads. Writes are serialized by the lock handed out through [`SqliteBarStore::writer`].
#[derive(Debug)]
pub struct SqliteBarStore {
    database_url: String,
    writer_lock: Mutex<()>,
}

impl SqliteBarStore {
    /// Opens the store at `database_url`, applying pending migrations.
    pub fn open(database_url: impl Into<String>) -> Result<Self, StoreError> {
        let database_url = database_url.into();
        migrate::run_sqlite(&database_url)?;
        Ok(Self {
            database_url,
            writer_lock: Mutex::new(()),
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Acquires the exclusive writer lock, blocking until any other writer is done.
    ///
    /// A writer that panicked cannot leave a ticker half written (its transaction
    /// rolls back), so a poisoned lock is simply taken over.
    pub fn writer(&self) -> Result<BarWriter<'_>, StoreError> {
        let guard = self
            .writer_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let conn = self.connect()?;
        Ok(BarWriter {
            conn,
            _guard: guard,
        })
    }

    fn connect(&self) -> Result<SqliteConnection, StoreError> {
        connect_sqlite(&self.database_url)
    }
}

impl BarReader for SqliteBarStore {
    fn get(&self, ticker: &str, date: NaiveDate) -> Result<Option<StoredBar>, StoreError> {
        let mut conn = self.connect()?;
        let bar = sb::stock_bars
            .filter(sb::ticker.eq(ticker))
            .filter(sb::date.eq(date))
            .select(StoredBar::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(bar)
    }

    fn latest_on_or_before(
        &self,
        ticker: &str,
        as_of: NaiveDate,
    ) -> Result<Option<StoredBar>, StoreError> {
        let mut conn = self.connect()?;
        let bar = sb::stock_bars
            .filter(sb::ticker.eq(ticker))
            .filter(sb::date.le(as_of))
            .order(sb::date.desc())
            .select(StoredBar::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(bar)
    }

    fn query(&self, query: &BarQuery) -> Result<Vec<StoredBar>, StoreError> {
        let mut conn = self.connect()?;
        let mut q = sb::stock_bars
            .select(StoredBar::as_select())
            .into_boxed();

        if let Some(ticker) = &query.ticker {
            q = q.filter(sb::ticker.eq(ticker.clone()));
        }
        q = match query.from {
            Bound::Included(d) => q.filter(sb::date.ge(d)),
            Bound::Excluded(d) => q.filter(sb::date.gt(d)),
            Bound::Unbounded => q,
        };
        q = match query.to {
            Bound::Included(d) => q.filter(sb::date.le(d)),
            Bound::Excluded(d) => q.filter(sb::date.lt(d)),
            Bound::Unbounded => q,
        };

        let bars = q
            .order((sb::ticker.asc(), sb::date.asc()))
            .load(&mut conn)?;
        Ok(bars)
    }

    fn date_range(&self, ticker: &str) -> Result<Option<(NaiveDate, NaiveDate)>, StoreError> {
        let mut conn = self.connect()?;
        let (first, last): (Option<NaiveDate>, Option<NaiveDate>) = sb::stock_bars
            .filter(sb::ticker.eq(ticker))
            .select((min(sb::date), max(sb::date)))
            .first(&mut conn)?;
        Ok(first.zip(last))
    }

    fn count(&self, ticker: Option<&str>) -> Result<i64, StoreError> {
        let mut conn = self.connect()?;
        let mut q = sb::stock_bars.select(count_star()).into_boxed();
        if let Some(ticker) = ticker {
            q = q.filter(sb::ticker.eq(ticker.to_owned()));
        }
        Ok(q.get_result(&mut conn)?)
    }
}

/// Exclusive write access to a [`SqliteBarStore`].
///
/// Holds the store's writer lock until dropped.
pub struct BarWriter<'s> {
    // declared before the guard so the connection closes first
    conn: SqliteConnection,
    _guard: MutexGuard<'s, ()>,
}

impl BarWriter<'_> {
    /// Upserts the annotated bars of one ticker in a single transaction.
    ///
    /// Rows that already exist for (ticker, date) have every value column
    /// overwritten, including indicators that are now undefined. On error nothing
    /// of this ticker is written. Returns the number of rows touched.
    pub fn upsert_ticker(&mut self, ticker: &str, bars: &[IndicatorBar]) -> Result<usize, StoreError> {
        let written = self
            .conn
            .immediate_transaction::<_, diesel::result::Error, _>(|conn| {
                let mut written = 0;
                for bar in bars {
                    let row = NewStoredBar::new(ticker, bar);
                    written += diesel::insert_into(sb::stock_bars)
                        .values(&row)
                        .on_conflict((sb::ticker, sb::date))
                        .do_update()
                        .set(&row)
                        .execute(conn)?;
                }
                Ok(written)
            })?;
        Ok(written)
    }
}
