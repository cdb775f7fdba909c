//! Storage layer.
//!
//! Two pieces:
//! - **Dedup store**: the in-memory record set consulted every cycle
//! - **State backends**: where the record set is persisted between runs

mod dedup;
pub mod persistence;
pub mod traits;

pub use dedup::DedupStore;
pub use persistence::{InMemoryBackend, JsonFileBackend};
pub use traits::{StateBackend, StoreSnapshot};

use std::path::PathBuf;

/// Returns the default location of the state file.
///
/// Uses the platform data directory (`~/.local/share/reddit2dynalist/` on
/// Linux), falling back to the working directory when no home is known.
#[must_use]
pub fn default_state_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "reddit2dynalist").map_or_else(
        || PathBuf::from(persistence::DEFAULT_STATE_FILE),
        |dirs| dirs.data_dir().join(persistence::DEFAULT_STATE_FILE),
    )
}
