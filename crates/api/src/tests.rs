use std::sync::Arc;

use actix_web::{body::to_bytes, http::StatusCode, test, web, App};
use chrono::{Duration, Utc};
use pairwatch_domain::config::MonitorConfig;
use pairwatch_domain::model::{AbnormalRecord, StateRecord};
use pairwatch_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
use pairwatch_domain::storage::StateStore;
use pairwatch_storage::JsonFileStore;
use tempfile::TempDir;

use crate::handlers::{metrics_handler, stats_handler, ErrorBody};
use crate::report::{StatusSnapshot, RECENT_ABNORMAL_LIMIT};
use crate::state::AppState;

fn telemetry() -> TelemetryGuard {
    let config = TelemetryConfig::from_env("API_TEST");
    init_telemetry(&config).expect("telemetry inits")
}

fn store() -> (TempDir, JsonFileStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::open(dir.path().join("transaction_data.json"));
    (dir, store)
}

fn monitor_config() -> MonitorConfig {
    MonitorConfig::new("0xAbC0000000000000000000000000000000000001", "ETH", "MPH").unwrap()
}

fn abnormal(hash: &str) -> AbnormalRecord {
    AbnormalRecord {
        hash: hash.to_string(),
        timestamp: "2024-03-01T12:00:00Z".to_string(),
        method: "transfer".to_string(),
        to_address: "0x9999999999999999999999999999999999999999".to_string(),
        to_name: Some("Stranger".to_string()),
        value: "1000".to_string(),
        status: "ok".to_string(),
        gas_used: "21000".to_string(),
    }
}

fn state_for(store: &JsonFileStore) -> AppState {
    AppState::new(Arc::new(store.clone()), telemetry())
}

#[actix_web::test]
async fn stats_is_not_found_without_record() {
    let (_dir, store) = store();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state_for(&store)))
            .route("/stats", web::get().to(stats_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/stats").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body = to_bytes(resp.into_body()).await.unwrap();
    let error: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.error, "no monitoring data available");
}

#[actix_web::test]
async fn stats_is_not_found_for_unreadable_record() {
    let (_dir, store) = store();
    std::fs::write(store.path(), b"{ definitely not json").unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state_for(&store)))
            .route("/stats", web::get().to(stats_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/stats").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn stats_reports_unstarted_record() {
    let (_dir, store) = store();
    store.initialize_if_absent(&monitor_config()).await.unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state_for(&store)))
            .route("/stats", web::get().to(stats_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/stats").to_request();
    let snapshot: StatusSnapshot = test::call_and_read_body_json(&app, req).await;

    assert_eq!(snapshot.monitor_info.start_time, None);
    assert_eq!(snapshot.monitor_info.monitoring_duration, "Not started");
    assert_eq!(
        snapshot.monitor_info.monitored_address.as_str(),
        "0xabc0000000000000000000000000000000000001"
    );
    assert_eq!(snapshot.statistics.total_transactions, 0);
    assert_eq!(snapshot.statistics.abnormal_percentage, "0%");
    assert_eq!(snapshot.token_info.quote_token.symbol, "MPH");
    assert_eq!(snapshot.dex_contracts.len(), 2);
    assert!(snapshot.recent_abnormal_transactions.is_empty());
}

#[actix_web::test]
async fn stats_reports_counts_and_latest_abnormal() {
    let (_dir, store) = store();
    let mut record = StateRecord::new(monitor_config());
    record
        .monitoring
        .ensure_started(Utc::now() - Duration::hours(3));
    for i in 0..15 {
        record.record_abnormal(abnormal(&format!("0xbad{i}")));
    }
    for _ in 0..45 {
        record.record_expected();
    }
    store.save(&record).await.unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state_for(&store)))
            .route("/stats", web::get().to(stats_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/stats").to_request();
    let snapshot: StatusSnapshot = test::call_and_read_body_json(&app, req).await;

    assert_eq!(snapshot.statistics.total_transactions, 60);
    assert_eq!(snapshot.statistics.abnormal_transactions, 15);
    assert_eq!(snapshot.statistics.abnormal_percentage, "25.00%");
    assert!(snapshot.monitor_info.start_time.is_some());
    assert!(snapshot.monitor_info.monitoring_duration.starts_with("3:00:"));

    let recent = &snapshot.recent_abnormal_transactions;
    assert_eq!(recent.len(), RECENT_ABNORMAL_LIMIT);
    assert_eq!(recent[0].hash, "0xbad5");
    assert_eq!(recent[RECENT_ABNORMAL_LIMIT - 1].hash, "0xbad14");
    assert_eq!(recent[0].to_name.as_deref(), Some("Stranger"));
}

#[actix_web::test]
async fn stats_never_writes_the_record() {
    let (_dir, store) = store();
    store.initialize_if_absent(&monitor_config()).await.unwrap();
    let before = std::fs::read(store.path()).unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state_for(&store)))
            .route("/stats", web::get().to(stats_handler)),
    )
    .await;
    let req = test::TestRequest::get().uri("/stats").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(std::fs::read(store.path()).unwrap(), before);
}

#[actix_web::test]
async fn metrics_endpoint_renders_prometheus_text() {
    let (_dir, store) = store();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state_for(&store)))
            .route("/stats", web::get().to(stats_handler))
            .route("/metrics", web::get().to(metrics_handler)),
    )
    .await;

    let stats = test::TestRequest::get().uri("/stats").to_request();
    let _ = test::call_service(&app, stats).await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp
        .headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
    let body = to_bytes(resp.into_body()).await.unwrap();
    assert!(std::str::from_utf8(&body).is_ok());
}
