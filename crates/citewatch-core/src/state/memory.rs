// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Provides a simple state store that doesn't persist across restarts.
// Useful for testing and for embedding the engine where a repeated
// first-run notification after restart is acceptable.
//
// ## Crash Behavior
//
// - The count is lost on restart/crash
// - The first cycle after a restart always notifies (absent state)

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::StateStore;

/// In-memory state store implementation
///
/// Clones share the same underlying value, so a test can keep a handle
/// and inspect what the engine wrote.
///
/// # Example
///
/// ```rust
/// use citewatch_core::state::MemoryStateStore;
/// use citewatch_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///     assert_eq!(store.read().await, None);
///
///     store.write(42).await?;
///     assert_eq!(store.read().await, Some(42));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<Option<u64>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a count
    pub fn with_value(value: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(value))),
        }
    }

    /// Forget the stored count
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read(&self) -> Option<u64> {
        *self.inner.read().await
    }

    async fn write(&self, value: u64) -> Result<(), Error> {
        *self.inner.write().await = Some(value);
        Ok(())
    }
}
