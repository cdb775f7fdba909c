//! Business logic services.
//!
//! [`SyncService`] runs a single cycle; [`Scheduler`] runs cycles on an
//! interval until shutdown.

mod scheduler;
mod sync;

pub use scheduler::{Scheduler, SchedulerConfig};
pub use sync::{CycleContext, CycleReport, SyncOptions, SyncService};
