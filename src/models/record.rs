//! Dedup records.

use super::ItemId;
use chrono::{DateTime, Duration, Utc};

/// Marker that a delivery attempt has been made for an item.
///
/// The existence of the record, not anything about the item's content, is
/// what suppresses re-delivery. Records are never updated in place; they are
/// only created and later evicted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupRecord {
    /// The item this record covers.
    pub id: ItemId,
    /// When the item was first observed.
    pub first_seen_at: DateTime<Utc>,
}

impl DedupRecord {
    /// Creates a new record.
    #[must_use]
    pub const fn new(id: ItemId, first_seen_at: DateTime<Utc>) -> Self {
        Self { id, first_seen_at }
    }

    /// Age of the record at `now`.
    ///
    /// Negative when the clock moved backwards since the record was made.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.first_seen_at)
    }

    /// Returns `true` when the record is older than `window`.
    ///
    /// The boundary is exclusive: a record whose age equals `window` exactly
    /// is still retained.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now) > window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let seen = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().expect("valid date");
        let record = DedupRecord::new(ItemId::new("t3_a"), seen);
        let window = Duration::days(7);

        assert!(!record.is_expired(seen + window, window));
        assert!(record.is_expired(seen + window + Duration::seconds(1), window));
    }

    #[test]
    fn test_clock_skew_never_expires() {
        let seen = Utc.with_ymd_and_hms(2026, 1, 8, 0, 0, 0).single().expect("valid date");
        let record = DedupRecord::new(ItemId::new("t3_a"), seen);
        let earlier = seen - Duration::days(3);

        assert!(record.age(earlier) < Duration::zero());
        assert!(!record.is_expired(earlier, Duration::days(7)));
    }
}
