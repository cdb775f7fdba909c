//! Test doubles shared by the integration tests.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use reddit2dynalist::models::{DocumentId, Item};
use reddit2dynalist::{ContentSource, DocumentSink, Error, Result};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A saved post with a predictable fullname, title and permalink.
pub fn post(id: &str) -> Item {
    Item::post(
        format!("t3_{id}"),
        "alice",
        format!("Title {id}"),
        format!("/r/rust/comments/{id}/title/"),
    )
}

/// A saved comment with a predictable fullname and permalink.
pub fn comment(id: &str) -> Item {
    Item::comment(
        format!("t1_{id}"),
        "bob",
        format!("/r/rust/comments/p/title/{id}/"),
    )
}

/// Content source returning a configurable batch.
#[derive(Default)]
pub struct FakeSource {
    items: Mutex<Vec<Item>>,
    failing: AtomicBool,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSource {
    pub fn with_items(items: Vec<Item>) -> Self {
        let source = Self::default();
        source.set_items(items);
        source
    }

    pub fn set_items(&self, items: Vec<Item>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ContentSource for FakeSource {
    fn name(&self) -> &'static str {
        "fake-source"
    }

    fn fetch_saved(&self, limit: usize) -> Result<Vec<Item>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::SourceUnavailable {
                cause: "HTTP 503".to_string(),
            });
        }
        Ok(self.items.lock().unwrap().iter().take(limit).cloned().collect())
    }
}

/// Document sink recording every append.
#[derive(Default)]
pub struct FakeSink {
    appended: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    fail_on: Mutex<HashSet<String>>,
    cancel_after_first: Mutex<Option<CancellationToken>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails any append whose text contains `needle`.
    pub fn fail_on(&self, needle: &str) {
        self.fail_on.lock().unwrap().insert(needle.to_string());
    }

    /// Cancels `token` once the first append has been attempted.
    pub fn cancel_after_first(&self, token: CancellationToken) {
        *self.cancel_after_first.lock().unwrap() = Some(token);
    }

    pub fn appended(&self) -> Vec<String> {
        self.appended.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl DocumentSink for FakeSink {
    fn name(&self) -> &'static str {
        "fake-sink"
    }

    fn append_entry(&self, _document: &DocumentId, text: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = self.cancel_after_first.lock().unwrap().take() {
            token.cancel();
        }

        let fail = self
            .fail_on
            .lock()
            .unwrap()
            .iter()
            .any(|needle| text.contains(needle.as_str()));
        if fail {
            return Err(Error::Sink {
                cause: "LockFail".to_string(),
            });
        }

        self.appended.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn resolve_document(&self, name: &str) -> Result<DocumentId> {
        if name == "Reddit" {
            Ok(DocumentId::new("doc-reddit"))
        } else {
            Err(Error::NotFound(format!("document '{name}'")))
        }
    }
}
