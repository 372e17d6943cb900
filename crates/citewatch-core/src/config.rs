//! Configuration types for the citation watcher
//!
//! This module defines all configuration structures used throughout the crate.
//! Loading them from the environment is the daemon's job; the types here only
//! hold values and validate them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default state file, relative to the working directory
pub const DEFAULT_STATE_PATH: &str = "last_citation_count.txt";

/// Main watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Which author to track
    pub author: AuthorSelector,

    /// State store configuration
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl WatchConfig {
    /// Create a new configuration with default store and engine settings
    pub fn new(author: AuthorSelector) -> Self {
        Self {
            author,
            state_store: StateStoreConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.author.validate()?;
        self.state_store.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// How the tracked author is identified
///
/// An id is an exact profile lookup. A name goes through search and takes
/// the first hit, which can resolve to a different person with the same
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AuthorSelector {
    /// Unique profile identifier
    Id(String),
    /// Display name, resolved through search
    Name(String),
}

impl AuthorSelector {
    /// Resolve the selector from the two optional settings
    ///
    /// Blank values count as unset. When both are set the id wins; when
    /// neither is set this is a configuration error.
    pub fn resolve(id: Option<&str>, name: Option<&str>) -> Result<Self, crate::Error> {
        let id = id.map(str::trim).filter(|s| !s.is_empty());
        let name = name.map(str::trim).filter(|s| !s.is_empty());

        match (id, name) {
            (Some(id), Some(name)) => {
                tracing::warn!(
                    "Both author id ({}) and author name ({}) configured, using the id",
                    id,
                    name
                );
                Ok(Self::Id(id.to_string()))
            }
            (Some(id), None) => Ok(Self::Id(id.to_string())),
            (None, Some(name)) => Ok(Self::Name(name.to_string())),
            (None, None) => Err(crate::Error::config(
                "No author configured: set an author id or an author name",
            )),
        }
    }

    /// Validate the selector
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            AuthorSelector::Id(id) if id.trim().is_empty() => {
                Err(crate::Error::config("Author id cannot be empty"))
            }
            AuthorSelector::Name(name) if name.trim().is_empty() => {
                Err(crate::Error::config("Author name cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Human-readable description used in logs and notification bodies
    pub fn describe(&self) -> String {
        match self {
            AuthorSelector::Id(id) => format!("ID: {}", id),
            AuthorSelector::Name(name) => format!("Name: {}", name),
        }
    }

    /// The raw id or name
    pub fn value(&self) -> &str {
        match self {
            AuthorSelector::Id(v) | AuthorSelector::Name(v) => v,
        }
    }
}

impl std::fmt::Display for AuthorSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// State store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based state store
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory state store (not persistent)
    Memory,
}

impl StateStoreConfig {
    /// Validate the state store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StateStoreConfig::File { path } if path.trim().is_empty() => {
                Err(crate::Error::config("State file path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        StateStoreConfig::File {
            path: DEFAULT_STATE_PATH.to_string(),
        }
    }
}

/// Outbound mail settings
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP server host name
    #[serde(default = "default_smtp_server")]
    pub server: String,

    /// SMTP server port (465 = implicit TLS, anything else = STARTTLS)
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Sender address, also used as the SMTP username
    pub sender: String,

    /// SMTP password (an app password for Gmail accounts with 2FA)
    pub password: String,

    /// Where notifications are delivered
    pub receiver: String,
}

impl SmtpConfig {
    /// Validate the mail settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.server.trim().is_empty() {
            return Err(crate::Error::config("SMTP server cannot be empty"));
        }
        if self.port == 0 {
            return Err(crate::Error::config("SMTP port must be > 0"));
        }
        if self.sender.trim().is_empty() {
            return Err(crate::Error::config("Sender email is required"));
        }
        if self.password.is_empty() {
            return Err(crate::Error::config("Sender password is required"));
        }
        if self.receiver.trim().is_empty() {
            return Err(crate::Error::config("Receiver email is required"));
        }
        Ok(())
    }
}

// Hand-written so the password never reaches a log line
impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("receiver", &self.receiver)
            .finish()
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Time between the end of one cycle and the start of the next (in milliseconds)
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log) rather than
    /// stalling the loop.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Check interval as a [`Duration`]
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Set the check interval
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.check_interval_ms == 0 {
            return Err(crate::Error::config("Check interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: default_check_interval_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_check_interval_ms() -> u64 {
    60 * 60 * 1000
}

fn default_event_channel_capacity() -> usize {
    100
}
