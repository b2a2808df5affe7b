//! Time-bounded memoization of search results.
//!
//! [`TtlCache`] stores successful results for a fixed time-to-live. A producer
//! runs outside the lock, so two threads missing the same key at once may both
//! compute it; the later insert wins. Errors are never stored. Expired entries
//! are dropped whenever a new value is inserted.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use chrono::NaiveDate;
use tracing::debug;

use crate::{
    search::{LookupError, SimilarityMatch, SimilaritySearch},
    store::BarReader,
};

/// A map whose entries expire `ttl` after insertion.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (Instant, Arc<V>)>>,
}

impl<K: Eq + Hash + Clone, V> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The live value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|(inserted, _)| inserted.elapsed() < self.ttl)
            .map(|(_, value)| Arc::clone(value))
    }

    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, (inserted, _)| inserted.elapsed() < self.ttl);
        entries.insert(key, (Instant::now(), Arc::clone(&value)));
        value
    }

    /// Returns the live value for `key`, or runs `producer` and stores its result.
    pub fn get_or_compute<E>(
        &self,
        key: K,
        producer: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let value = producer()?;
        Ok(self.insert(key, value))
    }

    /// Drops expired entries.
    pub fn purge_expired(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, (inserted, _)| inserted.elapsed() < self.ttl);
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A [`SimilaritySearch`] that reuses results per (ticker, as-of date).
///
/// Results can be stale for up to the cache TTL after an ingestion run.
pub struct CachedSearch<R> {
    search: SimilaritySearch<R>,
    cache: TtlCache<(String, NaiveDate), Vec<SimilarityMatch>>,
}

impl<R: BarReader> CachedSearch<R> {
    pub fn new(search: SimilaritySearch<R>, ttl: Duration) -> Self {
        Self {
            search,
            cache: TtlCache::new(ttl),
        }
    }

    pub fn search(
        &self,
        ticker: &str,
        as_of: NaiveDate,
    ) -> Result<Arc<Vec<SimilarityMatch>>, LookupError> {
        let mut computed = false;
        let matches = self.cache.get_or_compute((ticker.to_owned(), as_of), || {
            computed = true;
            self.search.search(ticker, as_of)
        })?;
        if !computed {
            debug!(ticker, %as_of, "search cache hit");
        }
        Ok(matches)
    }

    /// Number of cached result lists, expired ones included until the next insert.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn inner(&self) -> &SimilaritySearch<R> {
        &self.search
    }

    /// Forgets every cached result, e.g. after new bars were ingested.
    pub fn invalidate(&self) {
        self.cache.clear();
    }
}
