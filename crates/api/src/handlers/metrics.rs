use actix_web::{web, HttpResponse};

use crate::state::AppState;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4";

/// Prometheus scrape of the monitor and status-server counters.
pub async fn metrics_handler(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(PROMETHEUS_TEXT)
        .body(state.telemetry().render_metrics())
}
