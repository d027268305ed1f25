use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use strum_macros::AsRefStr;
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use pairwatch_domain::{
    config::{ConfigError, MonitorConfig},
    model::StateRecord,
    storage::{StateStore, StorageError},
};

use crate::{
    explorer::TransactionSource,
    pipeline::{new_transactions, process_transaction, TxClass},
};

#[derive(Debug, Error, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum MonitorError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("fetch error: {0}")]
    Fetch(String),
    #[error("monitor was already started; a stopped monitor cannot be resumed")]
    AlreadyStarted,
}

impl From<reqwest::Error> for MonitorError {
    fn from(value: reqwest::Error) -> Self {
        Self::Fetch(value.to_string())
    }
}

/// Lifecycle of the continuous runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RunnerState {
    Idle,
    Running,
    Stopped,
}

/// Outcome of one poll-and-classify cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub new: usize,
    pub abnormal: usize,
    pub high_water_mark: Option<String>,
}

/// Poller bound to one monitored address. Owns its collaborators; nothing
/// about it is global.
pub struct Monitor<S, T> {
    config: MonitorConfig,
    store: S,
    source: T,
    state: RunnerState,
}

impl<S, T> Monitor<S, T>
where
    S: StateStore,
    T: TransactionSource,
{
    pub fn new(config: MonitorConfig, store: S, source: T) -> Self {
        Self {
            config,
            store,
            source,
            state: RunnerState::Idle,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub async fn run_once(&self) -> Result<CycleReport, MonitorError> {
        run_once(&self.config, &self.store, &self.source, Utc::now()).await
    }

    /// Runs cycles every `interval` until `cancel` fires. Cycle failures are
    /// logged and retried after the same interval; only cancellation ends
    /// the loop, after which the monitor stays `Stopped`.
    pub async fn start(
        &mut self,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Result<(), MonitorError> {
        if self.state != RunnerState::Idle {
            return Err(MonitorError::AlreadyStarted);
        }
        self.state = RunnerState::Running;
        info!(
            address = %self.config.monitored_address(),
            pair = %format!("{}/{}", self.config.base_token(), self.config.quote_token()),
            interval_secs = interval.as_secs(),
            "starting continuous monitoring"
        );

        while !cancel.is_cancelled() {
            match self.run_once().await {
                Ok(report) => {
                    counter!("monitor_cycles_total", "result" => "ok").increment(1);
                    info!(
                        fetched = report.fetched,
                        new = report.new,
                        abnormal = report.abnormal,
                        "monitoring cycle finished"
                    );
                }
                Err(err) => {
                    let result = err.as_ref().to_owned();
                    counter!("monitor_cycles_total", "result" => result).increment(1);
                    error!(%err, "monitoring cycle failed; retrying after interval");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(interval) => {}
            }
        }

        self.state = RunnerState::Stopped;
        info!("monitoring stopped");
        Ok(())
    }
}

/// One poll-and-classify cycle: fetch the newest page, count what is above
/// the high-water mark (oldest first), move the mark to the newest hash and
/// persist the record.
///
/// A fetch failure returns before anything is written.
pub async fn run_once<S, T>(
    config: &MonitorConfig,
    store: &S,
    source: &T,
    now: DateTime<Utc>,
) -> Result<CycleReport, MonitorError>
where
    S: StateStore,
    T: TransactionSource,
{
    let page = source.fetch_transactions(config.monitored_address()).await?;
    let mut record = load_or_initialize(config, store).await?;

    if record.config.monitored_address() != config.monitored_address() {
        warn!(
            persisted = %record.config.monitored_address(),
            configured = %config.monitored_address(),
            "state record belongs to a different address; counters will be shared"
        );
    }

    let repaired = record.monitoring.ensure_started(now);

    let Some(newest) = page.items.first() else {
        if repaired {
            store.save(&record).await?;
        }
        return Ok(CycleReport {
            high_water_mark: record.monitoring.last_processed_tx().map(str::to_owned),
            ..CycleReport::default()
        });
    };

    let fresh = new_transactions(&page.items, record.monitoring.last_processed_tx());
    record.monitoring.advance_high_water_mark(newest.hash.clone());

    let mut abnormal = 0;
    for tx in fresh.iter().rev() {
        if process_transaction(&mut record, tx, config) == TxClass::Abnormal {
            abnormal += 1;
        }
    }

    store.save(&record).await?;

    gauge!("monitor_last_batch_size").set(fresh.len() as f64);
    gauge!("monitor_abnormal_total").set(record.monitoring.abnormal_transactions() as f64);

    Ok(CycleReport {
        fetched: page.items.len(),
        new: fresh.len(),
        abnormal,
        high_water_mark: Some(newest.hash.clone()),
    })
}

async fn load_or_initialize<S>(
    config: &MonitorConfig,
    store: &S,
) -> Result<StateRecord, MonitorError>
where
    S: StateStore,
{
    match store.load().await {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Ok(store.initialize_if_absent(config).await?),
        Err(err) => {
            error!(%err, "state record unreadable; starting from a fresh record");
            Ok(StateRecord::new(config.clone()))
        }
    }
}
