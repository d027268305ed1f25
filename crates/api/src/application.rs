use std::{sync::Arc, time::Duration};

use actix_web::{middleware::Logger, web, App, HttpServer};
use pairwatch_domain::config::{BootstrapConfig, ConfigError, MonitorConfig};
use pairwatch_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryError};
use pairwatch_domain::storage::{StateStore, StorageError};
use pairwatch_monitor::{ExplorerClient, Monitor, MonitorError};
use pairwatch_storage::JsonFileStore;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    cli::Cli,
    handlers::{metrics_handler, stats_handler},
    state::AppState,
};

pub async fn run(cli: Cli) -> Result<(), BootstrapError> {
    let config = BootstrapConfig::load_from_env()?;
    let telemetry = init_telemetry(&TelemetryConfig::from_env("PAIRWATCH"))?;

    // Unknown token symbols stop the process here, before any polling.
    let monitor_config = MonitorConfig::new(&cli.address, &cli.base_token, &cli.quote_token)?;

    let store = JsonFileStore::open(config.state_file());
    if let Err(err) = store.initialize_if_absent(&monitor_config).await {
        warn!(
            %err,
            path = %store.path().display(),
            "state record not initialized; the first cycle will rebuild it"
        );
    }

    let source = ExplorerClient::new(config.explorer_api_url(), config.http_timeout())?;
    let mut monitor = Monitor::new(monitor_config, store.clone(), source);

    if !cli.monitor {
        let report = monitor.run_once().await?;
        info!(
            fetched = report.fetched,
            new = report.new,
            abnormal = report.abnormal,
            "single cycle finished"
        );
        return Ok(());
    }

    let state = AppState::new(Arc::new(store), telemetry);
    let server = status_server(state, config.status_bind_address())?;
    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);
    info!(bind = config.status_bind_address(), "status endpoint listening");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    actix_web::rt::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received; stopping monitor"),
            Err(err) => error!(%err, "cannot listen for interrupt; stopping monitor"),
        }
        interrupt.cancel();
    });

    let outcome = monitor
        .start(Duration::from_secs(cli.interval), cancel)
        .await;

    server_handle.stop(true).await;
    server_task
        .await
        .map_err(|err| BootstrapError::Io(std::io::Error::other(err.to_string())))??;

    outcome.map_err(BootstrapError::from)
}

fn status_server(
    state: AppState,
    bind_address: &str,
) -> Result<actix_web::dev::Server, BootstrapError> {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .route("/stats", web::get().to(stats_handler))
            .route("/metrics", web::get().to(metrics_handler))
    })
    .disable_signals()
    .bind(bind_address)?
    .run();

    Ok(server)
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
