//! Core traits for the citation watcher
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`CountSource`]: Fetch the current citation count for an author
//! - [`Notifier`]: Deliver an increase notification
//! - [`StateStore`]: Persist the last notified count

pub mod count_source;
pub mod notifier;
pub mod state_store;

pub use count_source::{CountSource, Observation};
pub use notifier::Notifier;
pub use state_store::StateStore;
