//! Deduplication store.
//!
//! Tracks which item IDs have already had a delivery attempt, with the time
//! each was first seen so old records can be evicted.

use super::traits::{StateBackend, StoreSnapshot};
use crate::Result;
use crate::models::{DedupRecord, ItemId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// In-memory dedup store.
///
/// The store is a plain value: the sync service borrows it mutably for the
/// duration of a cycle and nothing else touches it. Durability comes from
/// [`DedupStore::persist`] at the end of each cycle.
///
/// # Invariants
///
/// - An ID is present iff a delivery attempt for it has been made.
/// - After [`DedupStore::evict`] with `window`, no record is older than
///   `window` relative to the `now` passed in.
///
/// # Example
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use reddit2dynalist::models::ItemId;
/// use reddit2dynalist::storage::DedupStore;
///
/// let mut store = DedupStore::new();
/// let now = Utc::now();
/// store.record(ItemId::new("t3_abc"), now);
/// assert!(store.contains(&ItemId::new("t3_abc")));
///
/// store.evict(now + Duration::days(8), Duration::days(7));
/// assert!(store.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupStore {
    records: HashMap<ItemId, DateTime<Utc>>,
}

impl DedupStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from a persisted snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            records: snapshot.records.into_iter().collect(),
        }
    }

    /// Copies the record set into a snapshot for persistence.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            records: self
                .records
                .iter()
                .map(|(id, seen)| (id.clone(), *seen))
                .collect(),
        }
    }

    /// Returns `true` if a record exists for `id`, regardless of its age.
    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.records.contains_key(id)
    }

    /// Records a delivery attempt for `id` at `now`.
    ///
    /// Overwrites the timestamp if a record already exists; there is never
    /// more than one record per ID. Returns `true` if the ID was not present.
    pub fn record(&mut self, id: ItemId, now: DateTime<Utc>) -> bool {
        self.records.insert(id, now).is_none()
    }

    /// Removes every record whose age at `now` exceeds `window`.
    ///
    /// A record aged exactly `window` is kept. Returns the number removed.
    pub fn evict(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, seen| now.signed_duration_since(*seen) <= window);
        before - self.records.len()
    }

    /// When `id` was first seen, if recorded.
    #[must_use]
    pub fn first_seen(&self, id: &ItemId) -> Option<DateTime<Utc>> {
        self.records.get(id).copied()
    }

    /// Iterates over all records in arbitrary order.
    pub fn records(&self) -> impl Iterator<Item = DedupRecord> + '_ {
        self.records
            .iter()
            .map(|(id, seen)| DedupRecord::new(id.clone(), *seen))
    }

    /// The record with the earliest first-seen time.
    #[must_use]
    pub fn oldest(&self) -> Option<DedupRecord> {
        self.records
            .iter()
            .min_by_key(|(_, seen)| **seen)
            .map(|(id, seen)| DedupRecord::new(id.clone(), *seen))
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Loads the store from `backend`.
    ///
    /// Never fails: missing state yields an empty store, and unreadable or
    /// corrupt state is logged and also yields an empty store. Starting empty
    /// can re-deliver items seen before the failure on the next cycle.
    #[instrument(skip(backend), fields(location = %backend.location()))]
    pub fn load(backend: &dyn StateBackend) -> Self {
        match backend.load() {
            Ok(Some(snapshot)) => {
                let store = Self::from_snapshot(snapshot);
                info!(records = store.len(), "Loaded dedup state");
                store
            },
            Ok(None) => {
                info!("No dedup state found, starting with an empty store");
                Self::new()
            },
            Err(e) => {
                warn!(error = %e, "Failed to load dedup state, starting with an empty store");
                metrics::counter!("dedup_store_load_failures_total").increment(1);
                Self::new()
            },
        }
    }

    /// Writes the full record set to `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StorePersist`] if the backend write fails. The
    /// in-memory store is unaffected either way.
    #[instrument(skip(self, backend), fields(location = %backend.location(), records = self.len()))]
    pub fn persist(&self, backend: &dyn StateBackend) -> Result<()> {
        backend.persist(&self.snapshot())?;
        debug!("Persisted dedup state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::persistence::InMemoryBackend;
    use chrono::TimeZone;
    use test_case::test_case;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0)
            .single()
            .expect("valid date")
    }

    #[test]
    fn test_contains_ignores_age() {
        let mut store = DedupStore::new();
        store.record(ItemId::new("t3_a"), at(1));
        assert!(store.contains(&ItemId::new("t3_a")));
        assert!(!store.contains(&ItemId::new("t3_b")));
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut store = DedupStore::new();
        assert!(store.record(ItemId::new("t3_a"), at(1)));
        assert!(!store.record(ItemId::new("t3_a"), at(2)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.first_seen(&ItemId::new("t3_a")), Some(at(2)));
    }

    #[test]
    fn test_evict_on_empty_store() {
        let mut store = DedupStore::new();
        assert_eq!(store.evict(at(10), Duration::days(7)), 0);
        assert!(store.is_empty());
    }

    #[test_case(Duration::days(7) - Duration::seconds(1), false ; "inside window")]
    #[test_case(Duration::days(7), false ; "exactly at window is retained")]
    #[test_case(Duration::days(7) + Duration::seconds(1), true ; "past window is evicted")]
    #[test_case(Duration::days(30), true ; "long expired")]
    fn test_evict_boundary(age: Duration, evicted: bool) {
        let mut store = DedupStore::new();
        let seen = at(1);
        store.record(ItemId::new("t3_a"), seen);

        let removed = store.evict(seen + age, Duration::days(7));

        assert_eq!(removed, usize::from(evicted));
        assert_eq!(store.contains(&ItemId::new("t3_a")), !evicted);
    }

    #[test]
    fn test_evict_keeps_recent_records() {
        let mut store = DedupStore::new();
        store.record(ItemId::new("t3_old"), at(1));
        store.record(ItemId::new("t3_new"), at(9));

        assert_eq!(store.evict(at(10), Duration::days(7)), 1);
        assert!(!store.contains(&ItemId::new("t3_old")));
        assert!(store.contains(&ItemId::new("t3_new")));
    }

    #[test]
    fn test_oldest() {
        let mut store = DedupStore::new();
        assert!(store.oldest().is_none());
        store.record(ItemId::new("t3_b"), at(5));
        store.record(ItemId::new("t3_a"), at(2));

        let oldest = store.oldest().expect("non-empty store");
        assert_eq!(oldest.id.as_str(), "t3_a");
        assert_eq!(oldest.first_seen_at, at(2));
    }

    #[test]
    fn test_persist_then_load_round_trip() {
        let backend = InMemoryBackend::new();
        let mut store = DedupStore::new();
        store.record(ItemId::new("t3_a"), at(1));
        store.record(ItemId::new("t1_b"), at(2));

        store.persist(&backend).expect("persist should succeed");
        let loaded = DedupStore::load(&backend);

        assert_eq!(loaded, store);
    }

    #[test]
    fn test_load_missing_state_is_empty() {
        let backend = InMemoryBackend::new();
        assert!(DedupStore::load(&backend).is_empty());
    }

    #[test]
    fn test_load_failure_is_empty() {
        let backend = InMemoryBackend::new().failing_loads();
        let mut store = DedupStore::new();
        store.record(ItemId::new("t3_a"), at(1));
        store.persist(&backend).expect("persist should succeed");

        assert!(DedupStore::load(&backend).is_empty());
    }
}
