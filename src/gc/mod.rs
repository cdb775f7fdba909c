//! Garbage collection of dedup records.
//!
//! The dedup store would grow without bound if every item ID ever seen were
//! kept. The content source only ever returns the most recent saves, so a
//! record older than the retention window can no longer suppress anything
//! and is safe to drop.
//!
//! # Example
//!
//! ```rust,ignore
//! use reddit2dynalist::gc::{RetentionConfig, RetentionGarbageCollector};
//!
//! let gc = RetentionGarbageCollector::new(RetentionConfig::new().with_days(14));
//! let result = gc.collect(&mut store, chrono::Utc::now());
//! println!("{}", result.summary());
//! ```

mod retention;

pub use retention::{
    DEFAULT_RETENTION_DAYS, RETENTION_DAYS_ENV, RetentionConfig, RetentionGarbageCollector,
    RetentionGcResult,
};
