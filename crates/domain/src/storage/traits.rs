use async_trait::async_trait;
use thiserror::Error;

use crate::{config::MonitorConfig, model::StateRecord};

/// Common result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("state record i/o failed: {0}")]
    Io(String),
    #[error("state record is corrupt: {0}")]
    Corrupt(String),
}

impl StorageError {
    pub fn from_io(err: impl std::fmt::Display) -> Self {
        Self::Io(err.to_string())
    }

    pub fn from_decode(err: impl std::fmt::Display) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Read side of the state record. The status reporter depends on nothing
/// more than this.
#[async_trait]
pub trait StateReader: Send + Sync {
    /// `Ok(None)` when no record has been written yet.
    async fn load(&self) -> StorageResult<Option<StateRecord>>;
}

/// Full store contract used by the poller, the single writer.
#[async_trait]
pub trait StateStore: StateReader {
    /// Replaces the persisted record as a whole; readers see either the
    /// previous or the new record, never a mix.
    async fn save(&self, record: &StateRecord) -> StorageResult<()>;

    /// Writes a zeroed record bound to `config` unless one already exists.
    /// An existing record is returned untouched.
    async fn initialize_if_absent(&self, config: &MonitorConfig) -> StorageResult<StateRecord> {
        if let Some(existing) = self.load().await? {
            return Ok(existing);
        }
        let record = StateRecord::new(config.clone());
        self.save(&record).await?;
        Ok(record)
    }
}
