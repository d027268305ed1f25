use std::sync::Arc;

use pairwatch_domain::services::telemetry::TelemetryGuard;
use pairwatch_domain::storage::StateReader;

/// Shared handler state. Handlers only ever read the state record.
#[derive(Clone)]
pub struct AppState {
    reader: Arc<dyn StateReader>,
    telemetry: TelemetryGuard,
}

impl AppState {
    pub fn new(reader: Arc<dyn StateReader>, telemetry: TelemetryGuard) -> Self {
        Self { reader, telemetry }
    }

    pub fn reader(&self) -> &dyn StateReader {
        self.reader.as_ref()
    }

    pub fn telemetry(&self) -> &TelemetryGuard {
        &self.telemetry
    }
}
