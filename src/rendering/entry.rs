//! Entry renderer.

use crate::models::{Item, ItemKind};

/// Host used to turn permalinks into absolute links.
pub const DEFAULT_LINK_HOST: &str = "reddit.com";

/// Renders items as outline entry text.
///
/// Pure and deterministic: the output depends only on the item and the
/// configured host.
///
/// | Item | Rendered as |
/// |------|-------------|
/// | comment | `Comment by {author} - https://{host}{permalink}` |
/// | post with title | `{title} - https://{host}{permalink}` |
/// | post without title | `Post by {author} - https://{host}{permalink}` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRenderer {
    host: String,
}

impl Default for EntryRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_HOST)
    }
}

impl EntryRenderer {
    /// Creates a renderer linking to `host`.
    ///
    /// A scheme prefix or trailing slash on `host` is stripped.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        let host = host
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        Self { host }
    }

    /// Returns the link host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Absolute URL for a permalink.
    #[must_use]
    pub fn link(&self, permalink: &str) -> String {
        format!("https://{}{}", self.host, permalink)
    }

    /// Renders `item` as entry text.
    #[must_use]
    pub fn render(&self, item: &Item) -> String {
        let link = self.link(&item.permalink);
        match item.kind {
            ItemKind::Comment => format!("Comment by {} - {link}", item.author),
            ItemKind::Post if item.title.is_empty() => {
                format!("Post by {} - {link}", item.author)
            },
            ItemKind::Post => format!("{} - {link}", item.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_comment() {
        let item = Item::comment("t1_c", "alice", "/r/rust/comments/1/x/c/");
        assert_eq!(
            EntryRenderer::default().render(&item),
            "Comment by alice - https://reddit.com/r/rust/comments/1/x/c/"
        );
    }

    #[test]
    fn test_render_titled_post() {
        let item = Item::post("t3_p", "bob", "Ownership explained", "/r/rust/comments/1/own/");
        assert_eq!(
            EntryRenderer::default().render(&item),
            "Ownership explained - https://reddit.com/r/rust/comments/1/own/"
        );
    }

    #[test]
    fn test_render_untitled_post() {
        let item = Item::post("t3_p", "bob", "", "/r/rust/comments/2/");
        assert_eq!(
            EntryRenderer::default().render(&item),
            "Post by bob - https://reddit.com/r/rust/comments/2/"
        );
    }

    #[test]
    fn test_comment_ignores_title() {
        let mut item = Item::comment("t1_c", "alice", "/c/");
        item.title = "should not appear".to_string();
        assert_eq!(
            EntryRenderer::default().render(&item),
            "Comment by alice - https://reddit.com/c/"
        );
    }

    #[test]
    fn test_custom_host_is_normalized() {
        let renderer = EntryRenderer::new("https://old.reddit.com/");
        assert_eq!(renderer.host(), "old.reddit.com");
        assert_eq!(renderer.link("/r/x/"), "https://old.reddit.com/r/x/");
    }
}
