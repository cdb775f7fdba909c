//! Data models for reddit2dynalist.
//!
//! Items are what the content source hands us on each poll; dedup records
//! are what survives between polls.

mod item;
mod record;

pub use item::{DocumentId, Item, ItemId, ItemKind};
pub use record::DedupRecord;
