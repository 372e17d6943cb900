// # File State Store
//
// File-based implementation of StateStore.
//
// ## Purpose
//
// Keeps the last notified citation count across restarts and crashes, so a
// restarted watcher does not announce the same increase twice.
//
// ## Crash Safety
//
// - Atomic writes: the new value goes to a `.tmp` sibling, is synced, then
//   renamed over the state file
// - Tolerant reads: a missing, empty or unparseable file reads as "no prior
//   observation" instead of failing
//
// ## File Format
//
// A single decimal integer followed by a newline:
//
// ```text
// 1234
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::state_store::StateStore;

/// File-based state store
///
/// The file is read on every [`StateStore::read`] call rather than cached,
/// so the value on disk is always the source of truth.
///
/// # Example
///
/// ```rust,no_run
/// use citewatch_core::state::FileStateStore;
/// use citewatch_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/citewatch/last_count.txt").await?;
///
///     store.write(1234).await?;
///     assert_eq!(store.read().await, Some(1234));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a file state store
    ///
    /// Creates the parent directory if it doesn't exist. The state file
    /// itself is only created by the first write.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        Ok(Self { path })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the file content into a count
    fn parse_count(content: &str) -> Option<u64> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return None;
        }
        trimmed.parse::<u64>().ok()
    }

    /// Get path to temporary file for atomic writes
    ///
    /// Appends `.tmp` to the full file name, so it never equals the target.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn read(&self) -> Option<u64> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "State file {} not found, no previous count recorded",
                    self.path.display()
                );
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read state file {}: {}. Treating as no previous count.",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        match Self::parse_count(&content) {
            Some(count) => {
                tracing::debug!("Loaded count {} from {}", count, self.path.display());
                Some(count)
            }
            None if content.trim().is_empty() => {
                tracing::info!(
                    "State file {} is empty, no previous count recorded",
                    self.path.display()
                );
                None
            }
            None => {
                tracing::warn!(
                    "Could not parse a count from {} (content: {:?}). Treating as no previous count.",
                    self.path.display(),
                    content.trim()
                );
                None
            }
        }
    }

    async fn write(&self, value: u64) -> Result<(), Error> {
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(format!("{}\n", value).as_bytes())
                .await
                .map_err(|e| {
                    Error::state_store(format!(
                        "Failed to write to temp file {}: {}",
                        temp_path.display(),
                        e
                    ))
                })?;

            file.flush().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Atomic rename (temp -> actual)
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                tracing::debug!("Failed to remove {}: {}", temp_path.display(), cleanup);
            }
            return Err(Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            )));
        }

        tracing::trace!("Count {} written to {}", value, self.path.display());
        Ok(())
    }
}
