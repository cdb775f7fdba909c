//! Periodic cycle scheduler.

use super::sync::{CycleContext, SyncService};
use crate::config::{DEFAULT_CYCLE_TIMEOUT_SECS, DEFAULT_INTERVAL_SECS};
use crate::storage::DedupStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

/// Scheduler timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between cycle starts.
    pub interval: Duration,
    /// Deadline handed to each cycle.
    pub cycle_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            cycle_timeout: Duration::from_secs(DEFAULT_CYCLE_TIMEOUT_SECS),
        }
    }
}

/// Drives [`SyncService::run_cycle`] on a fixed interval.
///
/// The first cycle starts immediately. A cycle runs on the blocking pool and
/// the next tick is not polled until it returns, so cycles never overlap; a
/// cycle that overruns the interval delays the next one instead of causing a
/// burst.
#[derive(Debug, Clone)]
pub struct Scheduler {
    service: Arc<SyncService>,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Creates a scheduler for `service`.
    #[must_use]
    pub const fn new(service: Arc<SyncService>, config: SchedulerConfig) -> Self {
        Self { service, config }
    }

    /// Runs cycles until `shutdown` is cancelled, then returns the store.
    ///
    /// Cancelling `shutdown` also cancels the in-flight cycle, which stops at
    /// its next checkpoint.
    #[instrument(
        name = "reddit2dynalist.scheduler",
        skip(self, store, shutdown),
        fields(interval_secs = self.config.interval.as_secs())
    )]
    pub async fn run(&self, mut store: DedupStore, shutdown: CancellationToken) -> DedupStore {
        // `interval` panics on a zero period.
        let period = self.config.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(records = store.len(), "Scheduler started");

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {},
            }

            store = self.run_one(store, &shutdown).await;
        }

        info!(records = store.len(), "Scheduler stopped");
        store
    }

    async fn run_one(&self, mut store: DedupStore, shutdown: &CancellationToken) -> DedupStore {
        let service = Arc::clone(&self.service);
        let ctx = CycleContext::new(Utc::now(), self.config.cycle_timeout, shutdown.child_token());

        let task = tokio::task::spawn_blocking(move || {
            let result = service.run_cycle(&mut store, &ctx);
            (store, result)
        });

        match task.await {
            // The cycle logs its own outcome.
            Ok((store, _result)) => store,
            Err(e) => {
                error!(error = %e, "Sync cycle task failed, reloading persisted state");
                metrics::counter!("sync_cycles_total", "outcome" => "panicked").increment(1);
                DedupStore::load(self.service.backend())
            },
        }
    }
}
