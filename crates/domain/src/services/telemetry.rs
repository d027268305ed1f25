use std::{
    env,
    fs::{File, OpenOptions},
    sync::{Arc, Mutex},
};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::hydrate_env_file;

static SUBSCRIBER_INSTALLED: OnceCell<()> = OnceCell::new();
static METRICS_HANDLE: OnceCell<Arc<PrometheusHandle>> = OnceCell::new();

const DEFAULT_LOG_FILTER: &str = "info";

/// Logging and metrics knobs for the `pairwatch` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    log_filter: String,
    log_file: Option<String>,
}

impl TelemetryConfig {
    /// Reads `<PREFIX>_LOG_FILTER` (an `EnvFilter` directive, `info` when
    /// unset) and `<PREFIX>_LOG_FILE` (an extra plain-text sink appended to
    /// alongside stdout). Blank values count as unset.
    pub fn from_env(prefix: &str) -> Self {
        let _ = hydrate_env_file();
        let prefix = prefix.trim().to_ascii_uppercase();
        let read = |suffix: &str| {
            env::var(format!("{prefix}_{suffix}"))
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            log_filter: read("LOG_FILTER").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            log_file: read("LOG_FILE"),
        }
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn log_file(&self) -> Option<&str> {
        self.log_file.as_deref()
    }
}

/// Handle onto the process-wide Prometheus recorder; cloned into the status
/// server so `/metrics` can render it.
#[derive(Clone)]
pub struct TelemetryGuard {
    prometheus: Arc<PrometheusHandle>,
}

impl TelemetryGuard {
    pub fn render_metrics(&self) -> String {
        self.prometheus.render()
    }
}

/// Installs the tracing subscriber and the metrics recorder. Safe to call
/// more than once; later calls reuse what the first one installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    install_tracing(config)?;
    Ok(TelemetryGuard {
        prometheus: install_metrics()?,
    })
}

fn install_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if SUBSCRIBER_INSTALLED.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_new(config.log_filter())
        .map_err(|err| TelemetryError::InvalidLogFilter(err.to_string()))?;

    let file_layer = match config.log_file() {
        Some(path) => {
            let file = open_log_file(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    if SUBSCRIBER_INSTALLED.set(()).is_ok() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .with(file_layer)
            .try_init()
            .map_err(|err| TelemetryError::Tracing(err.to_string()))?;
    }

    Ok(())
}

fn open_log_file(path: &str) -> Result<File, TelemetryError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| TelemetryError::LogFile(path.to_string(), err.to_string()))
}

fn install_metrics() -> Result<Arc<PrometheusHandle>, TelemetryError> {
    METRICS_HANDLE
        .get_or_try_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .map(Arc::new)
                .map_err(|err| TelemetryError::Metrics(err.to_string()))
        })
        .cloned()
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
    #[error("cannot open log file `{0}`: {1}")]
    LogFile(String, String),
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}
