//! Sync cycle.
//!
//! One cycle fetches the newest saved items, appends an entry for each one
//! the dedup store has not seen, evicts expired records and persists the
//! store. Cycles are synchronous; scheduling and cancellation live in
//! [`super::Scheduler`] and [`CycleContext`].

use crate::gc::RetentionGarbageCollector;
use crate::models::{DocumentId, ItemId};
use crate::rendering::EntryRenderer;
use crate::sink::DocumentSink;
use crate::source::{ContentSource, DEFAULT_FETCH_LIMIT};
use crate::storage::{DedupStore, StateBackend};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Per-cycle inputs that come from the caller rather than configuration.
#[derive(Debug, Clone)]
pub struct CycleContext {
    /// Wall-clock time recorded against new dedup records and used for
    /// eviction.
    pub now: DateTime<Utc>,
    /// The cycle stops starting new work once this passes.
    pub deadline: Instant,
    /// Cancelled on shutdown.
    pub cancel: CancellationToken,
}

impl CycleContext {
    /// Creates a context starting at `now` with `timeout` to run.
    #[must_use]
    pub fn new(now: DateTime<Utc>, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            now,
            deadline: Instant::now() + timeout,
            cancel,
        }
    }

    /// Creates a context starting at the current time with a fresh token.
    #[must_use]
    pub fn now(timeout: Duration) -> Self {
        Self::new(Utc::now(), timeout, CancellationToken::new())
    }

    /// Why the cycle should stop, if it should.
    #[must_use]
    pub fn interruption(&self) -> Option<&'static str> {
        if self.cancel.is_cancelled() {
            Some("shutdown requested")
        } else if Instant::now() >= self.deadline {
            Some("deadline exceeded")
        } else {
            None
        }
    }
}

/// Outcome of one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Candidates returned by the source.
    pub fetched: usize,
    /// Candidates already in the store.
    pub skipped: usize,
    /// Entries appended successfully (or rendered, in dry-run mode).
    pub delivered: usize,
    /// Appends that failed; these stay recorded.
    pub failed: usize,
    /// Records evicted by retention.
    pub evicted: usize,
    /// Whether the store was written to the backend.
    pub persisted: bool,
    /// Whether the deadline or shutdown cut delivery short.
    pub interrupted: bool,
    /// Wall time of the cycle.
    pub duration: Duration,
}

impl CycleReport {
    /// Metric label for this outcome.
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        if self.interrupted {
            "interrupted"
        } else {
            "success"
        }
    }

    /// Returns a human-readable summary of the cycle.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Delivered {} new item(s) ({} fetched, {} already seen, {} failed, {} evicted)",
            self.delivered, self.fetched, self.skipped, self.failed, self.evicted
        );
        if self.interrupted {
            summary.push_str(", interrupted");
        }
        summary
    }
}

/// Cycle options.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Candidates requested per fetch.
    pub fetch_limit: usize,
    /// Render and log without appending, recording or persisting.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            fetch_limit: DEFAULT_FETCH_LIMIT,
            dry_run: false,
        }
    }
}

/// Runs sync cycles between a content source and a document sink.
pub struct SyncService {
    source: Arc<dyn ContentSource>,
    sink: Arc<dyn DocumentSink>,
    backend: Arc<dyn StateBackend>,
    document: DocumentId,
    renderer: EntryRenderer,
    gc: RetentionGarbageCollector,
    options: SyncOptions,
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("source", &self.source.name())
            .field("sink", &self.sink.name())
            .field("backend", &self.backend.location())
            .field("document", &self.document)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn usize_to_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

fn duration_to_ms_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl SyncService {
    /// Creates a service with the default renderer, retention and options.
    #[must_use]
    pub fn new(
        source: Arc<dyn ContentSource>,
        sink: Arc<dyn DocumentSink>,
        backend: Arc<dyn StateBackend>,
        document: DocumentId,
    ) -> Self {
        Self {
            source,
            sink,
            backend,
            document,
            renderer: EntryRenderer::default(),
            gc: RetentionGarbageCollector::default(),
            options: SyncOptions::default(),
        }
    }

    /// Sets the entry renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: EntryRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Sets the retention collector.
    #[must_use]
    pub const fn with_gc(mut self, gc: RetentionGarbageCollector) -> Self {
        self.gc = gc;
        self
    }

    /// Sets the cycle options.
    #[must_use]
    pub const fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// The state backend cycles persist to.
    #[must_use]
    pub fn backend(&self) -> &dyn StateBackend {
        self.backend.as_ref()
    }

    /// Runs one cycle against `store`.
    ///
    /// Every new item is recorded before its append is attempted, so a failed
    /// append is not retried in later cycles.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceUnavailable`] if the fetch fails, or
    /// [`Error::CycleAborted`] if the context is cancelled or expired before
    /// delivery starts. In both cases `store` is untouched and nothing is
    /// persisted.
    #[instrument(
        name = "reddit2dynalist.sync.cycle",
        skip(self, store, ctx),
        fields(
            source = self.source.name(),
            sink = self.sink.name(),
            document = %self.document,
            dry_run = self.options.dry_run
        )
    )]
    pub fn run_cycle(&self, store: &mut DedupStore, ctx: &CycleContext) -> Result<CycleReport> {
        let start = Instant::now();

        let items = match self.fetch(ctx) {
            Ok(items) => items,
            Err(e) => {
                let outcome = if matches!(e, Error::CycleAborted(_)) {
                    "aborted"
                } else {
                    "failed"
                };
                metrics::counter!("sync_cycles_total", "outcome" => outcome).increment(1);
                error!(error = %e, outcome, "Sync cycle did not run");
                return Err(e);
            },
        };

        let mut report = CycleReport {
            fetched: items.len(),
            ..CycleReport::default()
        };
        let mut seen_this_cycle: HashSet<&ItemId> = HashSet::new();

        for item in &items {
            if let Some(reason) = ctx.interruption() {
                let attempted = report.skipped + report.delivered + report.failed;
                warn!(
                    reason,
                    remaining = items.len() - attempted,
                    "Stopping delivery early"
                );
                report.interrupted = true;
                break;
            }

            if store.contains(&item.id) || !seen_this_cycle.insert(&item.id) {
                debug!(item_id = %item.id, "Already seen, skipping");
                report.skipped += 1;
                continue;
            }

            let text = self.renderer.render(item);

            if self.options.dry_run {
                info!(item_id = %item.id, entry = %text, "Dry run: would append entry");
                report.delivered += 1;
                continue;
            }

            store.record(item.id.clone(), ctx.now);

            match self.sink.append_entry(&self.document, &text) {
                Ok(()) => {
                    info!(item_id = %item.id, kind = %item.kind, "Appended entry");
                    report.delivered += 1;
                },
                Err(e) => {
                    warn!(item_id = %item.id, error = %e, "Failed to append entry");
                    report.failed += 1;
                },
            }
        }

        if !self.options.dry_run {
            report.evicted = self.gc.collect(store, ctx.now).records_evicted;
            report.persisted = match store.persist(self.backend.as_ref()) {
                Ok(()) => true,
                Err(e) => {
                    error!(error = %e, "Failed to persist dedup state");
                    false
                },
            };
        }

        report.duration = start.elapsed();

        metrics::counter!("sync_cycles_total", "outcome" => report.outcome()).increment(1);
        metrics::counter!("sync_items_delivered_total").increment(usize_to_u64(report.delivered));
        metrics::counter!("sync_items_failed_total").increment(usize_to_u64(report.failed));
        metrics::histogram!("sync_cycle_duration_ms").record(duration_to_ms_f64(report.duration));

        info!(
            fetched = report.fetched,
            skipped = report.skipped,
            delivered = report.delivered,
            failed = report.failed,
            evicted = report.evicted,
            persisted = report.persisted,
            interrupted = report.interrupted,
            duration_ms = report.duration.as_millis(),
            "{}",
            report.summary()
        );

        Ok(report)
    }

    fn fetch(&self, ctx: &CycleContext) -> Result<Vec<crate::models::Item>> {
        if let Some(reason) = ctx.interruption() {
            return Err(Error::CycleAborted(format!("{reason} before fetch")));
        }
        let items = self.source.fetch_saved(self.options.fetch_limit)?;
        if let Some(reason) = ctx.interruption() {
            return Err(Error::CycleAborted(format!("{reason} after fetch")));
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_interruption() {
        let ctx = CycleContext::now(Duration::from_secs(30));
        assert!(ctx.interruption().is_none());

        ctx.cancel.cancel();
        assert_eq!(ctx.interruption(), Some("shutdown requested"));

        let expired = CycleContext::now(Duration::ZERO);
        assert_eq!(expired.interruption(), Some("deadline exceeded"));
    }

    #[test]
    fn test_report_summary() {
        let report = CycleReport {
            fetched: 25,
            skipped: 22,
            delivered: 2,
            failed: 1,
            evicted: 4,
            persisted: true,
            interrupted: false,
            duration: Duration::from_millis(12),
        };
        assert_eq!(
            report.summary(),
            "Delivered 2 new item(s) (25 fetched, 22 already seen, 1 failed, 4 evicted)"
        );
        assert_eq!(report.outcome(), "success");

        let interrupted = CycleReport {
            interrupted: true,
            ..CycleReport::default()
        };
        assert!(interrupted.summary().ends_with(", interrupted"));
        assert_eq!(interrupted.outcome(), "interrupted");
    }
}
