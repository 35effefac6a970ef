//! Snippet domain types.

use chrono::{DateTime, Utc};

use snippetbox_core::SnippetId;

/// A stored snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// Unique snippet ID.
    pub id: SnippetId,
    /// Title, 1-100 characters.
    pub title: String,
    /// Body text.
    pub content: String,
    /// When the snippet was created.
    pub created: DateTime<Utc>,
    /// After this instant the snippet is no longer served.
    pub expires: DateTime<Utc>,
}

impl Snippet {
    /// Creation time formatted for display.
    #[must_use]
    pub fn created_display(&self) -> String {
        human_date(self.created)
    }

    /// Expiry time formatted for display.
    #[must_use]
    pub fn expires_display(&self) -> String {
        human_date(self.expires)
    }

    /// Whether the snippet has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

/// A snippet ready to be inserted.
///
/// Timestamps are computed by the server, never taken from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSnippet {
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl NewSnippet {
    /// Build a snippet created at `now` that lives for `lifetime_secs` seconds.
    #[must_use]
    pub fn new(title: String, content: String, now: DateTime<Utc>, lifetime_secs: i64) -> Self {
        Self {
            title,
            content,
            created: now,
            expires: now + chrono::Duration::seconds(lifetime_secs),
        }
    }
}

/// Format a timestamp as e.g. `02 Jan 2006 at 15:04` (UTC).
#[must_use]
pub fn human_date(t: DateTime<Utc>) -> String {
    t.format("%d %b %Y at %H:%M").to_string()
}
