// # citewatch-core
//
// Core library for the citation count watcher.
//
// ## Architecture Overview
//
// This library provides the change-detection loop and the seams around it:
// - **CountSource**: Trait for fetching an author's current citation count
// - **Notifier**: Trait for delivering an increase notification
// - **StateStore**: Trait for the durable last-known count
// - **WatchEngine**: Core engine that orchestrates fetch → compare → notify → persist
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The loop knows nothing about Scholar or SMTP
// 2. **Fault Isolation**: A failed cycle is logged and the next one starts on schedule
// 3. **Notify Before Persist**: The stored count only advances after a delivered notification
// 4. **Library-First**: The daemon is a thin wrapper over this crate

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod message;
pub mod state;

// Re-export core types for convenience
pub use traits::{CountSource, Notifier, StateStore, Observation};
pub use engine::{WatchEngine, EngineEvent, CycleOutcome};
pub use config::{WatchConfig, AuthorSelector, EngineConfig, SmtpConfig, StateStoreConfig};
pub use error::{Error, Result, FetchError, NotifyError};
pub use message::NotificationMessage;
pub use state::{MemoryStateStore, FileStateStore};
