//! In-process state backend.
//!
//! Keeps the snapshot in memory. Used in tests, where it also counts persist
//! calls and can be told to fail.

use crate::storage::traits::{StateBackend, StoreSnapshot};
use crate::{Error, Result};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// State backend holding the snapshot in memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    snapshot: Mutex<Option<StoreSnapshot>>,
    persist_calls: AtomicUsize,
    fail_loads: bool,
    fail_persists: bool,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-populated with `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// Makes every `load` fail as if the state were corrupt.
    #[must_use]
    pub const fn failing_loads(mut self) -> Self {
        self.fail_loads = true;
        self
    }

    /// Makes every `persist` fail as if the disk were full.
    #[must_use]
    pub const fn failing_persists(mut self) -> Self {
        self.fail_persists = true;
        self
    }

    /// Number of `persist` calls made, including failed ones.
    #[must_use]
    pub fn persist_calls(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }

    /// The last snapshot successfully persisted.
    #[must_use]
    pub fn current(&self) -> Option<StoreSnapshot> {
        self.snapshot.lock().ok().and_then(|guard| guard.clone())
    }
}

impl StateBackend for InMemoryBackend {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn load(&self) -> Result<Option<StoreSnapshot>> {
        if self.fail_loads {
            return Err(Error::StoreLoad {
                path: self.location(),
                cause: "simulated corrupt state".to_string(),
            });
        }
        let guard = self.snapshot.lock().map_err(|e| Error::StoreLoad {
            path: self.location(),
            cause: e.to_string(),
        })?;
        Ok(guard.clone())
    }

    fn persist(&self, snapshot: &StoreSnapshot) -> Result<()> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_persists {
            return Err(Error::StorePersist {
                path: self.location(),
                cause: "simulated write failure".to_string(),
            });
        }
        let mut guard = self.snapshot.lock().map_err(|e| Error::StorePersist {
            path: self.location(),
            cause: e.to_string(),
        })?;
        *guard = Some(snapshot.clone());
        Ok(())
    }
}
