use actix_web::{web, HttpResponse};
use chrono::Utc;
use metrics::counter;
use pairwatch_domain::storage::StorageError;
use tracing::warn;

use crate::report::build_snapshot;
use crate::state::AppState;

use super::ApiError;

pub async fn stats_handler(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let record = match state.reader().load().await {
        Ok(Some(record)) => record,
        Ok(None) => {
            counter!("api_stats_requests_total", "status" => "not_found").increment(1);
            return Err(ApiError::NotFound);
        }
        Err(StorageError::Corrupt(reason)) => {
            warn!(%reason, "state record unreadable");
            counter!("api_stats_requests_total", "status" => "not_found").increment(1);
            return Err(ApiError::NotFound);
        }
        Err(err) => {
            counter!("api_stats_requests_total", "status" => "error").increment(1);
            return Err(err.into());
        }
    };

    counter!("api_stats_requests_total", "status" => "ok").increment(1);
    Ok(HttpResponse::Ok().json(build_snapshot(&record, Utc::now())))
}
