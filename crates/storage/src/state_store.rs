use std::{
    io::{ErrorKind, Write},
    path::Path,
};

use async_trait::async_trait;
use pairwatch_domain::model::StateRecord;
use pairwatch_domain::storage::{StateReader, StateStore, StorageError, StorageResult};
use tempfile::NamedTempFile;

use crate::JsonFileStore;

#[async_trait]
impl StateReader for JsonFileStore {
    async fn load(&self) -> StorageResult<Option<StateRecord>> {
        let bytes = match tokio::fs::read(self.path()).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::from_io(err)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(StorageError::from_decode)
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn save(&self, record: &StateRecord) -> StorageResult<()> {
        let payload = serde_json::to_vec_pretty(record).map_err(StorageError::from_io)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_replace(&path, &payload))
            .await
            .map_err(StorageError::from_io)?
    }
}

/// Writes into a sibling temp file, then renames it over `path`.
fn write_replace(path: &Path, payload: &[u8]) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir).map_err(StorageError::from_io)?;
    staged.write_all(payload).map_err(StorageError::from_io)?;
    staged.as_file().sync_all().map_err(StorageError::from_io)?;
    staged
        .persist(path)
        .map_err(|err| StorageError::from_io(err.error))?;
    Ok(())
}
