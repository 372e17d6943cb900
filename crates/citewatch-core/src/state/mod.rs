// # State Store Implementations
//
// This module provides implementations of the StateStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;

use crate::Error;
use crate::config::StateStoreConfig;
use crate::traits::StateStore;

/// Build the state store described by the configuration
///
/// File stores create their parent directory here, so a bad path fails at
/// startup rather than on the first write.
pub async fn from_config(config: &StateStoreConfig) -> Result<Box<dyn StateStore>, Error> {
    config.validate()?;

    match config {
        StateStoreConfig::File { path } => {
            let store = FileStateStore::new(path).await?;
            tracing::info!("State file: {}", store.path().display());
            Ok(Box::new(store))
        }
        StateStoreConfig::Memory => {
            tracing::warn!("Using in-memory state, counts will not survive a restart");
            Ok(Box::new(MemoryStateStore::new()))
        }
    }
}
