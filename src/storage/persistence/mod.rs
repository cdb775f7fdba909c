//! State backend implementations.

mod filesystem;
mod memory;

pub use filesystem::{DEFAULT_STATE_FILE, JsonFileBackend};
pub use memory::InMemoryBackend;
