//! State backend trait.

use crate::Result;
use crate::models::ItemId;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Point-in-time copy of the dedup store's record set.
///
/// This is the unit a [`StateBackend`] reads and writes: the whole record set,
/// overwritten wholesale, latest wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Item ID to first-seen timestamp.
    pub records: BTreeMap<ItemId, DateTime<Utc>>,
}

impl StoreSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the snapshot holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Trait for durable dedup state.
///
/// Backends hold a single snapshot. Only one process is expected to use a
/// given backend location at a time.
pub trait StateBackend: Send + Sync {
    /// Human-readable location, used in logs and errors.
    fn location(&self) -> String;

    /// Reads the last persisted snapshot.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreLoad`] if the state exists but cannot be
    /// read or parsed.
    fn load(&self) -> Result<Option<StoreSnapshot>>;

    /// Replaces the persisted snapshot.
    ///
    /// A failure part-way through must leave the previous snapshot readable.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StorePersist`] if the snapshot cannot be written.
    fn persist(&self, snapshot: &StoreSnapshot) -> Result<()>;
}
