//! Session-level contact directory
//!
//! Owns the current, fully ordered contact list and a handle to the call
//! statistics store. Readers take an immutable snapshot; every mutation builds
//! a new list and swaps it in, so a search never sees a half-applied update.
//! Mutations are serialized by `write_lock`.

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::contact::{Contact, ContactRecord};
use crate::error::{DialerError, DialerResult};
use crate::ordering::RecencyPolicy;
use crate::ranker;
use crate::source::ContactSource;
use crate::statistics::{self, CallCounter, CallStatisticsStore, StoreStats};

pub struct ContactDirectory {
    source: Arc<dyn ContactSource>,
    store: Arc<dyn CallStatisticsStore>,
    contacts: ArcSwap<Vec<Contact>>,
    write_lock: Mutex<()>,
    policy: RecencyPolicy,
}

impl ContactDirectory {
    /// Create an empty directory; call [`refresh`](Self::refresh) to populate it.
    pub fn new(
        source: Arc<dyn ContactSource>,
        store: Arc<dyn CallStatisticsStore>,
        policy: RecencyPolicy,
    ) -> Self {
        Self {
            source,
            store,
            contacts: ArcSwap::new(Arc::new(Vec::new())),
            write_lock: Mutex::new(()),
            policy,
        }
    }

    pub fn policy(&self) -> RecencyPolicy {
        self.policy
    }

    /// Ordered snapshot of the whole directory.
    pub fn current_directory(&self) -> Arc<Vec<Contact>> {
        self.contacts.load_full()
    }

    pub fn len(&self) -> usize {
        self.contacts.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild the directory from the contact source and the statistics store.
    ///
    /// Never fails: an unreadable source yields an empty directory, an
    /// unreadable counter counts as no calls. Returns the new contact count.
    pub async fn refresh(&self) -> usize {
        let _guard = self.write_lock.lock().await;
        let started = Instant::now();

        let records = match self.source.fetch_contacts().await {
            Ok(records) => records,
            Err(e) => {
                warn!("Contact source failed, directory will be empty: {}", e);
                Vec::new()
            }
        };

        let store = Arc::clone(&self.store);
        let policy = self.policy;
        let built = tokio::task::spawn_blocking(move || {
            build_directory(records, store.as_ref(), policy, Utc::now())
        })
        .await;

        let contacts = match built {
            Ok(contacts) => contacts,
            Err(e) => {
                error!("Directory build task failed: {}", e);
                Vec::new()
            }
        };

        let count = contacts.len();
        self.contacts.store(Arc::new(contacts));

        info!(
            "Directory refreshed: {} contacts in {:?}",
            count,
            started.elapsed()
        );
        count
    }

    /// Rank the current snapshot for `query` off the caller's thread.
    pub async fn search(&self, query: &str) -> Vec<Contact> {
        let snapshot = self.current_directory();
        if query.is_empty() {
            return snapshot.as_ref().clone();
        }

        let query = query.to_string();
        let ranked = tokio::task::spawn_blocking(move || {
            ranker::rank(&snapshot, &query).into_iter().cloned().collect::<Vec<_>>()
        })
        .await;

        match ranked {
            Ok(contacts) => contacts,
            Err(e) => {
                error!("Search task failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Rank the current snapshot on the calling thread.
    pub fn search_blocking(&self, query: &str) -> Vec<Contact> {
        let snapshot = self.current_directory();
        ranker::rank(&snapshot, query).into_iter().cloned().collect()
    }

    /// Record a completed call made now.
    pub async fn record_call(&self, phone_number: &str) -> DialerResult<CallCounter> {
        self.record_call_at(phone_number, Utc::now()).await
    }

    /// Record a completed call and move its contact to its new rank.
    ///
    /// The in-memory directory is updated even when the store write fails;
    /// the error is still returned so the caller knows history was not saved.
    pub async fn record_call_at(
        &self,
        phone_number: &str,
        at: DateTime<Utc>,
    ) -> DialerResult<CallCounter> {
        let _guard = self.write_lock.lock().await;

        let store = Arc::clone(&self.store);
        let number = phone_number.to_string();
        let persisted = tokio::task::spawn_blocking(move || {
            statistics::record_call(&number, at, store.as_ref())
        })
        .await
        .map_err(|e| DialerError::StoreUnavailable(format!("call recording task failed: {}", e)))
        .and_then(|result| result.map_err(|e| DialerError::store_unavailable(&e)));

        let mut contacts = self.current_directory().as_ref().clone();
        let owners: Vec<usize> = contacts
            .iter()
            .enumerate()
            .filter(|(_, c)| c.owns_number(phone_number))
            .map(|(idx, _)| idx)
            .collect();

        match owners.as_slice() {
            [] => debug!("Called number {} belongs to no contact", phone_number),
            [owner, rest @ ..] => {
                if !rest.is_empty() {
                    warn!(
                        "Number {} is shared by {} contacts; crediting the first one listed",
                        phone_number,
                        owners.len()
                    );
                }
                statistics::apply_call(&mut contacts[*owner], phone_number, at);
                // `at` may be backdated; recency is always judged against the wall clock
                self.policy.sort_contacts(&mut contacts, Utc::now());
                self.contacts.store(Arc::new(contacts));
            }
        }

        match &persisted {
            Ok(counter) => info!(
                "Call to {} recorded ({} total)",
                phone_number, counter.call_count
            ),
            Err(e) => warn!("Call to {} not persisted: {}", phone_number, e),
        }

        persisted
    }

    /// Totals across every stored counter, including numbers outside the directory.
    pub async fn store_stats(&self) -> DialerResult<StoreStats> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.enumerate_all())
            .await
            .map_err(|e| DialerError::StoreUnavailable(format!("enumeration task failed: {}", e)))?
            .map(|counters| StoreStats::from_counters(&counters))
            .map_err(|e| DialerError::store_unavailable(&e))
    }

    /// Push pending statistics to durable storage, e.g. before the app is suspended.
    pub async fn flush(&self) -> DialerResult<()> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.flush())
            .await
            .map_err(|e| DialerError::StoreUnavailable(format!("flush task failed: {}", e)))?
            .map_err(|e| DialerError::store_unavailable(&e))
    }
}

/// Merge statistics into every record and sort the result.
pub fn build_directory(
    records: Vec<ContactRecord>,
    store: &dyn CallStatisticsStore,
    policy: RecencyPolicy,
    now: DateTime<Utc>,
) -> Vec<Contact> {
    let mut contacts: Vec<Contact> = records
        .into_iter()
        .map(|record| statistics::merge_statistics(record, store))
        .collect();
    policy.sort_contacts(&mut contacts, now);
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticContactSource;
    use crate::statistics::{InMemoryCallStore, SqliteCallStore};
    use async_trait::async_trait;
    use chrono::Duration;

    struct DeniedSource;

    #[async_trait]
    impl ContactSource for DeniedSource {
        async fn fetch_contacts(&self) -> DialerResult<Vec<ContactRecord>> {
            Err(DialerError::source_unavailable("permission denied"))
        }
    }

    /// Reads work, writes fail.
    struct ReadOnlyStore(InMemoryCallStore);

    impl CallStatisticsStore for ReadOnlyStore {
        fn get(&self, n: &str) -> anyhow::Result<Option<CallCounter>> {
            self.0.get(n)
        }
        fn upsert(&self, _: &str, _: u64, _: DateTime<Utc>) -> anyhow::Result<()> {
            anyhow::bail!("attempt to write a readonly database")
        }
        fn enumerate_all(&self) -> anyhow::Result<Vec<CallCounter>> {
            self.0.enumerate_all()
        }
    }

    fn names(contacts: &[Contact]) -> Vec<&str> {
        contacts.iter().map(|c| c.given_name.as_str()).collect()
    }

    fn ann_and_bob() -> Vec<ContactRecord> {
        vec![
            ContactRecord::new("Ann").with_number("mobile", "123"),
            ContactRecord::new("Bob").with_number("mobile", "456"),
        ]
    }

    fn directory(
        records: Vec<ContactRecord>,
        store: Arc<dyn CallStatisticsStore>,
    ) -> ContactDirectory {
        ContactDirectory::new(
            Arc::new(StaticContactSource::new(records)),
            store,
            RecencyPolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_search_and_record_call() {
        let store = InMemoryCallStore::new();
        store.upsert("123", 2, Utc::now() - Duration::days(1)).unwrap();
        let dir = directory(ann_and_bob(), Arc::new(store));

        assert_eq!(dir.refresh().await, 2);
        assert_eq!(names(&dir.current_directory()), vec!["Ann", "Bob"]);

        // "b" shares key 2 with "a", so one digit is not enough to drop Bob
        assert_eq!(names(&dir.search("2").await), vec!["Ann", "Bob"]);
        assert_eq!(names(&dir.search("266").await), vec!["Ann"]);

        let counter = dir.record_call("456").await.unwrap();
        assert_eq!(counter.call_count, 1);
        assert_eq!(names(&dir.current_directory()), vec!["Bob", "Ann"]);

        let bob = &dir.current_directory()[0];
        assert_eq!(bob.call_count, 1);
        assert!(bob.last_call_date.is_some());
    }

    #[tokio::test]
    async fn test_empty_query_returns_directory_order() {
        let dir = directory(ann_and_bob(), Arc::new(InMemoryCallStore::new()));
        dir.refresh().await;

        let all = dir.search("").await;
        assert_eq!(all, dir.current_directory().as_ref().clone());
        assert_eq!(dir.search_blocking(""), all);
    }

    #[tokio::test]
    async fn test_source_failure_yields_empty_directory() {
        let dir = ContactDirectory::new(
            Arc::new(DeniedSource),
            Arc::new(InMemoryCallStore::new()),
            RecencyPolicy::default(),
        );

        assert_eq!(dir.refresh().await, 0);
        assert!(dir.is_empty());
        assert!(dir.search("266").await.is_empty());
    }

    #[tokio::test]
    async fn test_store_write_failure_is_reported_but_directory_updates() {
        let dir = directory(ann_and_bob(), Arc::new(ReadOnlyStore(InMemoryCallStore::new())));
        dir.refresh().await;

        let result = dir.record_call("456").await;

        assert!(matches!(result, Err(DialerError::StoreUnavailable(_))));
        assert_eq!(names(&dir.current_directory()), vec!["Bob", "Ann"]);
    }

    #[tokio::test]
    async fn test_call_to_unknown_number_persists_only() {
        let store = Arc::new(InMemoryCallStore::new());
        let dir = directory(ann_and_bob(), store.clone());
        dir.refresh().await;
        let before = dir.current_directory();

        dir.record_call("999").await.unwrap();

        assert_eq!(dir.current_directory(), before);
        assert_eq!(store.get("999").unwrap().unwrap().call_count, 1);
    }

    #[tokio::test]
    async fn test_shared_number_credits_first_contact_only() {
        let records = vec![
            ContactRecord::new("Ann").with_number("home", "555"),
            ContactRecord::new("Bob").with_number("home", "555"),
        ];
        let dir = directory(records, Arc::new(InMemoryCallStore::new()));
        dir.refresh().await;

        dir.record_call("555").await.unwrap();
        let contacts = dir.current_directory();

        assert_eq!(contacts[0].given_name, "Ann");
        assert_eq!(contacts[0].call_count, 1);
        assert_eq!(contacts[1].call_count, 0);
    }

    #[tokio::test]
    async fn test_snapshot_is_not_affected_by_later_updates() {
        let dir = directory(ann_and_bob(), Arc::new(InMemoryCallStore::new()));
        dir.refresh().await;

        let snapshot = dir.current_directory();
        dir.record_call("456").await.unwrap();

        assert_eq!(names(&snapshot), vec!["Ann", "Bob"]);
        assert_eq!(snapshot[1].call_count, 0);
        assert_eq!(names(&dir.current_directory()), vec!["Bob", "Ann"]);
    }

    #[tokio::test]
    async fn test_refresh_matches_in_place_updates() {
        // the in-place update and a full rebuild agree on the result
        let store: Arc<dyn CallStatisticsStore> =
            Arc::new(SqliteCallStore::new_in_memory().unwrap());
        let records = vec![
            ContactRecord::new("Ann").with_number("a", "1").with_number("b", "2"),
            ContactRecord::new("Bob").with_number("a", "3"),
            ContactRecord::new("Cy").with_number("a", "4"),
        ];
        let dir = directory(records, store);
        dir.refresh().await;

        let at = Utc::now();
        dir.record_call_at("2", at - Duration::hours(2)).await.unwrap();
        dir.record_call_at("4", at - Duration::hours(1)).await.unwrap();
        dir.record_call_at("2", at).await.unwrap();
        let updated = dir.current_directory();

        dir.refresh().await;
        let rebuilt = dir.current_directory();

        assert_eq!(names(&updated), vec!["Ann", "Cy", "Bob"]);
        assert_eq!(updated, rebuilt);
        assert_eq!(rebuilt[0].phone_numbers[0].number, "2");
        assert_eq!(rebuilt[0].call_count, 2);
    }

    #[tokio::test]
    async fn test_backdated_call_is_ranked_against_the_wall_clock() {
        let now = Utc::now();
        let store = InMemoryCallStore::with_counters(vec![
            CallCounter {
                phone_number: "4".into(),
                call_count: 1,
                last_call_date: now - Duration::days(4),
            },
            CallCounter {
                phone_number: "5".into(),
                call_count: 5,
                last_call_date: now - Duration::days(30),
            },
        ]);
        let records = vec![
            ContactRecord::new("Ann").with_number("mobile", "123"),
            ContactRecord::new("Cy").with_number("mobile", "4"),
            ContactRecord::new("Dee").with_number("mobile", "5"),
        ];
        let dir = directory(records, Arc::new(store));
        dir.refresh().await;

        dir.record_call_at("123", now - Duration::days(6)).await.unwrap();
        let in_place = dir.current_directory();

        dir.refresh().await;
        let rebuilt = dir.current_directory();

        // nobody is recent, so call count then name decides
        assert_eq!(names(&in_place), vec!["Dee", "Ann", "Cy"]);
        assert_eq!(in_place, rebuilt);
    }

    #[tokio::test]
    async fn test_padded_number_matches_exactly() {
        let store = Arc::new(InMemoryCallStore::new());
        let records = vec![
            ContactRecord::new("Ann").with_number("mobile", " 123"),
            ContactRecord::new("Bob").with_number("mobile", "456"),
        ];
        let dir = directory(records, store.clone());
        dir.refresh().await;

        dir.record_call(" 123").await.unwrap();

        let ann = &dir.current_directory()[0];
        assert_eq!(ann.given_name, "Ann");
        assert_eq!(ann.call_count, 1);
        assert_eq!(ann.phone_numbers[0].number, " 123");
        assert!(store.get("123").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_stats_and_flush() {
        let store = InMemoryCallStore::new();
        let dir = directory(ann_and_bob(), Arc::new(store));
        dir.refresh().await;

        dir.record_call("123").await.unwrap();
        dir.record_call("123").await.unwrap();
        dir.record_call("999").await.unwrap();

        let stats = dir.store_stats().await.unwrap();
        assert_eq!(stats, StoreStats { total_numbers: 2, total_calls: 3 });
        assert!(dir.flush().await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_are_not_lost() {
        let dir = Arc::new(directory(ann_and_bob(), Arc::new(InMemoryCallStore::new())));
        dir.refresh().await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let dir = Arc::clone(&dir);
            handles.push(tokio::spawn(async move {
                dir.record_call("123").await.unwrap();
                dir.search("266").await
            }));
        }
        for handle in handles {
            let ranked = handle.await.unwrap();
            assert_eq!(names(&ranked), vec!["Ann"]);
        }

        let ann = &dir.current_directory()[0];
        assert_eq!(ann.given_name, "Ann");
        assert_eq!(ann.call_count, 20);
    }
}
