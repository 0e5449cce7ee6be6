//! Checkpoint persistence
//!
//! The checkpoint is a single integer: the index of the next unprocessed
//! dataset item. It is written exactly once per run, after the whole chunk
//! is recorded, so a reader always sees a fully completed prior chunk.

use crate::error::{TallyError, TallyResult};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Trait for checkpoint storage backends
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the resume position. `None` means a fresh run.
    async fn load(&self) -> TallyResult<Option<usize>>;

    /// Persist a new resume position.
    ///
    /// The checkpoint is monotonically non-decreasing; saving a value below
    /// the stored one is an error, not a rewind.
    async fn save(&self, next: usize) -> TallyResult<()>;
}

/// File-based checkpoint store
///
/// Stores the integer as text in a single file, written via a temp file and
/// rename so a crash never leaves a torn value.
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> TallyResult<Option<usize>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TallyError::checkpoint(format!(
                    "Failed to read checkpoint file '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let value = content.trim().parse::<usize>().map_err(|e| {
            TallyError::checkpoint(format!(
                "Corrupt checkpoint file '{}' ({:?}): {}",
                self.path.display(),
                content.trim(),
                e
            ))
        })?;

        Ok(Some(value))
    }

    async fn save(&self, next: usize) -> TallyResult<()> {
        if let Some(current) = self.load().await? {
            if next < current {
                return Err(TallyError::checkpoint(format!(
                    "Refusing to move checkpoint backwards ({} -> {})",
                    current, next
                )));
            }
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    TallyError::checkpoint(format!(
                        "Failed to create checkpoint directory: {}",
                        e
                    ))
                })?;
            }
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, next.to_string()).await.map_err(|e| {
            TallyError::checkpoint(format!("Failed to write checkpoint file: {}", e))
        })?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            TallyError::checkpoint(format!("Failed to replace checkpoint file: {}", e))
        })?;

        tracing::debug!(next, path = %self.path.display(), "checkpoint saved");
        Ok(())
    }
}

/// In-memory checkpoint store (for testing)
#[derive(Default)]
pub struct MemoryCheckpointStore {
    value: tokio::sync::RwLock<Option<usize>>,
}

impl MemoryCheckpointStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> TallyResult<Option<usize>> {
        Ok(*self.value.read().await)
    }

    async fn save(&self, next: usize) -> TallyResult<()> {
        let mut value = self.value.write().await;
        if let Some(current) = *value {
            if next < current {
                return Err(TallyError::checkpoint(format!(
                    "Refusing to move checkpoint backwards ({} -> {})",
                    current, next
                )));
            }
        }
        *value = Some(next);
        Ok(())
    }
}
