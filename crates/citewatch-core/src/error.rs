//! Error types for the citation watcher
//!
//! This module defines all error types used throughout the crate.
//! [`FetchError`] and [`NotifyError`] are recoverable per-cycle failures;
//! the engine logs them and carries on. [`Error`] is the crate-wide type.

use thiserror::Error;

/// Result type alias for citation watcher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the citation watcher
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Count source failures
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Notifier failures
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Whether this error should stop the process before the loop starts
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Failure to obtain a citation count for one cycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The author or profile does not exist upstream
    #[error("author not found: {0}")]
    NotFound(String),

    /// The upstream source throttled or blocked the request
    #[error("rate limited by upstream: {0}")]
    RateLimited(String),

    /// Transport failure, timeout, or unexpected HTTP status
    #[error("network error: {0}")]
    Network(String),

    /// The response arrived but did not contain a readable count
    #[error("could not parse response: {0}")]
    Parse(String),
}

impl FetchError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Short machine-friendly name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::RateLimited(_) => "rate_limited",
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
        }
    }
}

/// Failure to deliver a notification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The transport refused the configured credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Could not reach or talk to the transport
    #[error("connection failed: {0}")]
    Connection(String),

    /// The transport refused the destination address
    #[error("recipient rejected: {0}")]
    RecipientRejected(String),
}

impl NotifyError {
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn recipient_rejected(msg: impl Into<String>) -> Self {
        Self::RecipientRejected(msg.into())
    }

    /// Short machine-friendly name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Connection(_) => "connection",
            Self::RecipientRejected(_) => "recipient_rejected",
        }
    }
}
