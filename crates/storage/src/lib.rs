//! File-backed storage adapter for the monitoring state record. One JSON
//! document holds the whole record; every save replaces it atomically so
//! the status server can read while the poller writes.

mod state_store;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// Shared storage handle used by the poller and the status server.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: Arc<PathBuf>,
}

impl JsonFileStore {
    /// Binds the store to `path`. Nothing is touched on disk until the first
    /// load or save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }
}
