//! Domain-level building blocks shared across the monitor, storage and API
//! crates: monitoring configuration, the persisted state record and the
//! store contracts.

pub mod config;
pub mod model;
pub mod services;
pub mod storage;

pub use config::{BootstrapConfig, ConfigError, MonitorConfig};
pub use model::{
    AbnormalHistory, AbnormalRecord, Address, MonitoringState, StateRecord,
    ABNORMAL_HISTORY_LIMIT, UNKNOWN,
};
pub use storage::{StateReader, StateStore, StorageError, StorageResult};
