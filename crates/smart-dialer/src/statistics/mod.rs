//! Call statistics - per-number call counters and the stores that keep them
pub mod merge;
pub mod migration;
pub mod sqlite_store;

pub use merge::{apply_call, merge_statistics, record_call};
pub use migration::MigrationManager;
pub use sqlite_store::SqliteCallStore;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Aggregate of completed calls to one phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCounter {
    pub phone_number: String,
    pub call_count: u64,
    pub last_call_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_numbers: usize,
    pub total_calls: u64,
}

impl StoreStats {
    pub fn from_counters(counters: &[CallCounter]) -> Self {
        Self {
            total_numbers: counters.len(),
            total_calls: counters.iter().map(|c| c.call_count).sum(),
        }
    }
}

/// Key-value store of call counters, keyed by phone number.
///
/// Numbers are compared as exact strings; normalizing them is up to the caller.
pub trait CallStatisticsStore: Send + Sync {
    fn get(&self, phone_number: &str) -> anyhow::Result<Option<CallCounter>>;

    fn upsert(
        &self,
        phone_number: &str,
        call_count: u64,
        last_call_date: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    fn enumerate_all(&self) -> anyhow::Result<Vec<CallCounter>>;

    /// Count one more call to `phone_number`, creating the counter if needed.
    fn increment(&self, phone_number: &str, at: DateTime<Utc>) -> anyhow::Result<CallCounter> {
        let call_count = self
            .get(phone_number)?
            .map_or(0, |counter| counter.call_count)
            + 1;
        self.upsert(phone_number, call_count, at)?;

        Ok(CallCounter {
            phone_number: phone_number.to_string(),
            call_count,
            last_call_date: at,
        })
    }

    /// Push pending writes to durable storage.
    fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Volatile store for tests and embedders that keep history elsewhere.
#[derive(Clone, Default)]
pub struct InMemoryCallStore {
    counters: Arc<DashMap<String, CallCounter>>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counters(counters: impl IntoIterator<Item = CallCounter>) -> Self {
        let store = Self::new();
        for counter in counters {
            store.counters.insert(counter.phone_number.clone(), counter);
        }
        store
    }
}

impl CallStatisticsStore for InMemoryCallStore {
    fn get(&self, phone_number: &str) -> anyhow::Result<Option<CallCounter>> {
        Ok(self.counters.get(phone_number).map(|entry| entry.clone()))
    }

    fn upsert(
        &self,
        phone_number: &str,
        call_count: u64,
        last_call_date: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.counters.insert(
            phone_number.to_string(),
            CallCounter {
                phone_number: phone_number.to_string(),
                call_count,
                last_call_date,
            },
        );
        Ok(())
    }

    fn enumerate_all(&self) -> anyhow::Result<Vec<CallCounter>> {
        let mut counters: Vec<CallCounter> =
            self.counters.iter().map(|entry| entry.value().clone()).collect();
        counters.sort_by(|a, b| a.phone_number.cmp(&b.phone_number));
        Ok(counters)
    }

    fn increment(&self, phone_number: &str, at: DateTime<Utc>) -> anyhow::Result<CallCounter> {
        // entry() holds the shard lock, so concurrent increments cannot lose a call
        let mut entry = self
            .counters
            .entry(phone_number.to_string())
            .or_insert_with(|| CallCounter {
                phone_number: phone_number.to_string(),
                call_count: 0,
                last_call_date: at,
            });
        entry.call_count += 1;
        entry.last_call_date = at;
        Ok(entry.clone())
    }
}
