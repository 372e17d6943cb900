//! Notification message composition
//!
//! A [`NotificationMessage`] is built by the engine for every detected
//! increase and handed to the [`Notifier`](crate::Notifier). It is never
//! persisted.

use chrono::{DateTime, Utc};

/// Timestamp format used in message bodies
const CHECKED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Content of one increase notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    /// Label for the author: the resolved display name, or the configured value
    pub author_label: String,
    /// How the author was looked up (e.g. "ID: qc6CJjYAAAAJ")
    pub query: String,
    /// Previously stored count, `None` on the first observation
    pub previous: Option<u64>,
    /// Newly observed count
    pub current: u64,
    /// When the count was fetched
    pub checked_at: DateTime<Utc>,
}

impl NotificationMessage {
    /// Create a message stamped with the current time
    pub fn new(
        author_label: impl Into<String>,
        query: impl Into<String>,
        previous: Option<u64>,
        current: u64,
    ) -> Self {
        Self {
            author_label: author_label.into(),
            query: query.into(),
            previous,
            current,
            checked_at: Utc::now(),
        }
    }

    /// Override the check timestamp
    pub fn with_checked_at(mut self, checked_at: DateTime<Utc>) -> Self {
        self.checked_at = checked_at;
        self
    }

    /// Increase since the previous count (absent previous counts as 0)
    pub fn delta(&self) -> u64 {
        self.current.saturating_sub(self.previous.unwrap_or(0))
    }

    /// Whether this is the first count ever recorded for the author
    pub fn is_first_observation(&self) -> bool {
        self.previous.is_none()
    }

    pub fn subject(&self) -> String {
        format!("Citation Increase for {} (+{})", self.author_label, self.delta())
    }

    pub fn body(&self) -> String {
        let change = match self.previous {
            Some(previous) => format!("previously {}, increase of {}", previous, self.delta()),
            None => "no previous count recorded".to_string(),
        };

        format!(
            "Author Searched: {}\n\
             Author Found: {}\n\
             New Total Citations: {} ({})\n\n\
             Checked on: {}",
            self.query,
            self.author_label,
            self.current,
            change,
            self.checked_at.format(CHECKED_AT_FORMAT),
        )
    }
}
