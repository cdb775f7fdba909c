//! # reddit2dynalist
//!
//! Mirrors newly saved Reddit posts and comments into a Dynalist document.
//!
//! The crate polls the account's "saved" listing on a fixed interval and
//! appends one outline entry per item it has not seen before. Which items have
//! already been delivered is tracked in a small durable dedup store, so a
//! restart resumes where the previous process stopped instead of re-delivering
//! the whole listing.
//!
//! ## Layout
//!
//! - [`storage`]: the dedup store and its state backends
//! - [`gc`]: retention-window eviction of old dedup records
//! - [`services`]: the sync cycle and the scheduler that drives it
//! - [`source`] / [`sink`]: Reddit and Dynalist clients behind traits
//! - [`rendering`]: item to outline-entry text
//!
//! ## Example
//!
//! ```rust,ignore
//! use reddit2dynalist::services::{CycleContext, SyncService};
//! use reddit2dynalist::storage::DedupStore;
//!
//! let mut store = DedupStore::load(backend.as_ref());
//! let report = service.run_cycle(&mut store, &CycleContext::now(timeout))?;
//! println!("delivered {}", report.delivered);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod gc;
pub mod models;
pub mod observability;
pub mod rendering;
pub mod services;
pub mod sink;
pub mod source;
pub mod storage;

pub use config::AppConfig;
pub use models::{DedupRecord, DocumentId, Item, ItemId, ItemKind};
pub use rendering::EntryRenderer;
pub use services::{CycleContext, CycleReport, Scheduler, SyncService};
pub use sink::DocumentSink;
pub use source::ContentSource;
pub use storage::{DedupStore, StateBackend};

/// Error type for reddit2dynalist operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When | Effect |
/// |---------|-------------|--------|
/// | `SourceUnavailable` | Reddit transport, auth or decode failure | Cycle aborted, store untouched |
/// | `Sink` | A single Dynalist append fails | Item skipped, stays recorded |
/// | `NotFound` | Named document missing from the file list | Fatal at startup |
/// | `StoreLoad` | State file unreadable, corrupt or oversized | Empty store used |
/// | `StorePersist` | State file cannot be written | Logged, memory stays authoritative |
/// | `CycleAborted` | Deadline or shutdown before delivery started | Same as a fetch failure |
/// | `InvalidInput` | Missing or malformed configuration | Fatal at startup |
/// | `OperationFailed` | Any other I/O failure | Propagated to the caller |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The content source could not produce a candidate batch.
    #[error("content source unavailable: {cause}")]
    SourceUnavailable {
        /// The underlying cause.
        cause: String,
    },

    /// The document sink rejected or failed an append.
    #[error("document sink error: {cause}")]
    Sink {
        /// The underlying cause.
        cause: String,
    },

    /// A named remote resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Persisted dedup state could not be read.
    #[error("failed to load dedup state from {path}: {cause}")]
    StoreLoad {
        /// Location of the state.
        path: String,
        /// The underlying cause.
        cause: String,
    },

    /// Dedup state could not be written.
    #[error("failed to persist dedup state to {path}: {cause}")]
    StorePersist {
        /// Location of the state.
        path: String,
        /// The underlying cause.
        cause: String,
    },

    /// A cycle stopped before any item was evaluated.
    #[error("sync cycle aborted: {0}")]
    CycleAborted(String),

    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - Required credentials are missing from config and environment
    /// - A numeric setting is zero or out of range
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns `true` for errors that end a cycle without touching the store.
    #[must_use]
    pub const fn aborts_cycle(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. } | Self::CycleAborted(_))
    }
}

/// Result type alias for reddit2dynalist operations.
pub type Result<T> = std::result::Result<T, Error>;
