//! Retention window garbage collector.
//!
//! Evicts dedup records older than the retention window.
//!
//! # Configuration
//!
//! - Environment variable: `REDDIT2DYNALIST_RETENTION_DAYS` (default: 7)
//! - Config file: `[retention] days = 7`

use crate::storage::DedupStore;
use chrono::{DateTime, Duration, Utc};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Environment variable for the retention window in days.
pub const RETENTION_DAYS_ENV: &str = "REDDIT2DYNALIST_RETENTION_DAYS";

/// Default retention window in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Safely converts Duration to milliseconds as u64, capping at `u64::MAX`.
#[inline]
fn duration_to_millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Converts usize to f64 for metrics, capping at `u32::MAX`.
#[inline]
fn usize_to_f64(value: usize) -> f64 {
    let capped = u32::try_from(value).unwrap_or(u32::MAX);
    f64::from(capped)
}

/// Retention policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionConfig {
    /// Retention window in days.
    pub days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl RetentionConfig {
    /// Creates a new retention config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `REDDIT2DYNALIST_RETENTION_DAYS` from `lookup`.
    ///
    /// Zero and unparsable values leave the current window in place.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(days) = lookup(RETENTION_DAYS_ENV)
            .and_then(|days| days.trim().parse::<u32>().ok())
            .filter(|days| *days > 0)
        {
            self.days = days;
        }
        self
    }

    /// Sets the retention window in days.
    #[must_use]
    pub const fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    /// The retention window as a duration.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::days(i64::from(self.days))
    }
}

/// Result of a retention garbage collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionGcResult {
    /// Records present before eviction.
    pub records_checked: usize,

    /// Records removed.
    pub records_evicted: usize,

    /// Duration of the run in milliseconds.
    pub duration_ms: u64,
}

impl RetentionGcResult {
    /// Returns `true` if any records were evicted.
    #[must_use]
    pub const fn has_evictions(&self) -> bool {
        self.records_evicted > 0
    }

    /// Returns a human-readable summary of the run.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.records_evicted == 0 {
            format!(
                "No expired records ({} checked in {}ms)",
                self.records_checked, self.duration_ms
            )
        } else {
            format!(
                "Evicted {} of {} records in {}ms",
                self.records_evicted, self.records_checked, self.duration_ms
            )
        }
    }
}

/// Evicts dedup records that have outlived the retention window.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionGarbageCollector {
    config: RetentionConfig,
}

impl RetentionGarbageCollector {
    /// Creates a new retention garbage collector.
    #[must_use]
    pub const fn new(config: RetentionConfig) -> Self {
        Self { config }
    }

    /// Evicts every record older than the window, measured at `now`.
    ///
    /// Safe on an empty store.
    #[instrument(
        name = "reddit2dynalist.gc.retention",
        skip(self, store),
        fields(component = "gc", retention_days = self.config.days)
    )]
    pub fn collect(&self, store: &mut DedupStore, now: DateTime<Utc>) -> RetentionGcResult {
        let start = Instant::now();
        let records_checked = store.len();
        let records_evicted = store.evict(now, self.config.window());

        let result = RetentionGcResult {
            records_checked,
            records_evicted,
            duration_ms: duration_to_millis(start.elapsed()),
        };

        metrics::counter!("dedup_records_evicted_total")
            .increment(u64::try_from(records_evicted).unwrap_or(u64::MAX));
        metrics::gauge!("dedup_store_size").set(usize_to_f64(store.len()));

        if result.has_evictions() {
            info!(
                records_checked,
                records_evicted,
                remaining = store.len(),
                "Evicted expired dedup records"
            );
        } else {
            debug!(records_checked, "No dedup records past retention window");
        }

        result
    }

    /// Returns the current retention configuration.
    #[must_use]
    pub const fn config(&self) -> &RetentionConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemId;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, d, 0, 0, 0)
            .single()
            .expect("valid date")
    }

    #[test]
    fn test_retention_config_default() {
        let config = RetentionConfig::default();
        assert_eq!(config.days, 7);
        assert_eq!(config.window(), Duration::days(7));
    }

    #[test]
    fn test_overrides_replace_window() {
        let config = RetentionConfig::new().with_overrides_from(|key| {
            (key == RETENTION_DAYS_ENV).then(|| "14".to_string())
        });
        assert_eq!(config.days, 14);
    }

    #[test]
    fn test_overrides_ignore_zero_and_garbage() {
        let base = RetentionConfig::new().with_days(3);

        let zero = base.with_overrides_from(|_| Some("0".to_string()));
        assert_eq!(zero.days, 3);

        let garbage = base.with_overrides_from(|_| Some("a week".to_string()));
        assert_eq!(garbage.days, 3);
    }

    #[test]
    fn test_collect_evicts_only_expired() {
        let mut store = DedupStore::new();
        store.record(ItemId::new("t3_old"), day(1));
        store.record(ItemId::new("t3_edge"), day(3));
        store.record(ItemId::new("t3_new"), day(9));

        let gc = RetentionGarbageCollector::new(RetentionConfig::new());
        let result = gc.collect(&mut store, day(10));

        assert_eq!(result.records_checked, 3);
        assert_eq!(result.records_evicted, 1);
        assert!(store.contains(&ItemId::new("t3_edge")));
        assert!(store.contains(&ItemId::new("t3_new")));
        assert!(!store.contains(&ItemId::new("t3_old")));
    }

    #[test]
    fn test_collect_on_empty_store() {
        let mut store = DedupStore::new();
        let result = RetentionGarbageCollector::default().collect(&mut store, day(10));
        assert!(!result.has_evictions());
        assert!(result.summary().contains("No expired records"));
    }

    #[test]
    fn test_summary_with_evictions() {
        let result = RetentionGcResult {
            records_checked: 40,
            records_evicted: 12,
            duration_ms: 1,
        };
        assert_eq!(result.summary(), "Evicted 12 of 40 records in 1ms");
    }
}
