//! Outline entry rendering.
//!
//! Turns a fetched item into the single line of text appended downstream.

mod entry;

pub use entry::{DEFAULT_LINK_HOST, EntryRenderer};
