//! Document sinks.
//!
//! A sink receives one rendered entry per newly seen item.

mod dynalist;

pub use dynalist::DynalistClient;

use crate::Result;
use crate::models::DocumentId;

/// Trait for outline-document services.
pub trait DocumentSink: Send + Sync {
    /// The sink name, used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Appends one entry with `text` to the document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Sink`] if the service rejects the append or
    /// cannot be reached.
    fn append_entry(&self, document: &DocumentId, text: &str) -> Result<()>;

    /// Looks up the document called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if no document has that name, or
    /// [`crate::Error::Sink`] if the lookup itself fails.
    fn resolve_document(&self, name: &str) -> Result<DocumentId>;
}
