//! Storage traits.

mod state;

pub use state::{StateBackend, StoreSnapshot};
