// # State Store Trait
//
// Defines the interface for the durable last-known citation count.
//
// ## Purpose
//
// The state store holds the watermark: the count that was last
// successfully notified. It is what lets a restarted process recognise
// that nothing changed while it was down.
//
// ## Implementations
//
// - File-based: a single text file holding one integer
// - In-memory: for tests and throwaway deployments

use async_trait::async_trait;

/// Trait for state store implementations
///
/// There is exactly one writer, the engine, and it never writes
/// concurrently with itself.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the last known count
    ///
    /// # Returns
    ///
    /// - `Some(count)`: A count was previously stored
    /// - `None`: Nothing stored yet, or the stored value is unreadable
    ///
    /// Read problems are logged by the implementation and never surfaced
    /// to the caller.
    async fn read(&self) -> Option<u64>;

    /// Overwrite the stored count
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The value is durable
    /// - `Err(Error)`: Storage error
    async fn write(&self, value: u64) -> Result<(), crate::Error>;
}
