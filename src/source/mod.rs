//! Content sources.
//!
//! A content source hands the sync cycle its candidate batch: the most
//! recently saved items, newest first.

mod reddit;

pub use reddit::{RedditClient, RedditCredentials, parse_listing};

use crate::Result;
use crate::models::Item;

/// Default number of candidates fetched per cycle.
pub const DEFAULT_FETCH_LIMIT: usize = 25;

/// Trait for content sources.
///
/// Implementations must tag every item with an ID that is globally unique
/// and stable across repeated calls; the dedup store relies on nothing else.
pub trait ContentSource: Send + Sync {
    /// The source name, used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Fetches up to `limit` most recently saved items, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SourceUnavailable`] on transport, auth or
    /// decode failure.
    fn fetch_saved(&self, limit: usize) -> Result<Vec<Item>>;
}
