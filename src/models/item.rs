//! Fetched items and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Globally unique, source-assigned identifier of a saved item.
///
/// For Reddit this is the fullname (`t3_abc123` for a post, `t1_def456` for
/// a comment), which stays stable across repeated listing calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates a new item ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of the outline document entries are appended to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates a new document ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of thing was saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A submission (link or self post).
    Post,
    /// A comment on a submission.
    Comment,
}

impl ItemKind {
    /// Maps a Reddit thing-kind prefix (`t1`, `t3`, ...) to an item kind.
    ///
    /// Only `t1` is a comment; every other saveable thing is treated as a post.
    #[must_use]
    pub fn from_thing_kind(kind: &str) -> Self {
        if kind == "t1" {
            Self::Comment
        } else {
            Self::Post
        }
    }

    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate fetched from the content source.
///
/// Items live for a single poll; nothing about them is retained across
/// cycles except their [`ItemId`], which the dedup store records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Stable unique identifier.
    pub id: ItemId,
    /// Post or comment.
    pub kind: ItemKind,
    /// Author username.
    pub author: String,
    /// Title, empty for comments and for untitled posts.
    pub title: String,
    /// Path relative to the source host, starting with `/`.
    pub permalink: String,
    /// When the item was created on the source.
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Creates a post item.
    #[must_use]
    pub fn post(
        id: impl Into<ItemId>,
        author: impl Into<String>,
        title: impl Into<String>,
        permalink: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Post,
            author: author.into(),
            title: title.into(),
            permalink: permalink.into(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Creates a comment item.
    #[must_use]
    pub fn comment(
        id: impl Into<ItemId>,
        author: impl Into<String>,
        permalink: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Comment,
            author: author.into(),
            title: String::new(),
            permalink: permalink.into(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub const fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns `true` if this item is a comment.
    #[must_use]
    pub const fn is_comment(&self) -> bool {
        matches!(self.kind, ItemKind::Comment)
    }
}
