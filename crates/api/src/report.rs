//! Read-only status snapshot rendered by `GET /stats`.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use pairwatch_domain::model::{timestamp::format_utc, AbnormalRecord, Address, StateRecord};
use serde::{Deserialize, Serialize};

/// How many abnormal transactions the snapshot carries.
pub const RECENT_ABNORMAL_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub monitor_info: MonitorInfo,
    pub token_info: TokenInfo,
    pub dex_contracts: BTreeMap<String, Address>,
    pub statistics: Statistics,
    pub recent_abnormal_transactions: Vec<AbnormalRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorInfo {
    pub start_time: Option<String>,
    pub current_time: String,
    pub monitoring_duration: String,
    pub monitored_address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub base_token: TokenEntry,
    pub quote_token: TokenEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub symbol: String,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_transactions: u64,
    pub abnormal_transactions: u64,
    pub abnormal_percentage: String,
}

pub fn build_snapshot(record: &StateRecord, now: DateTime<Utc>) -> StatusSnapshot {
    let config = &record.config;
    let monitoring = &record.monitoring;
    let start_time = monitoring.start_time();

    StatusSnapshot {
        monitor_info: MonitorInfo {
            start_time: start_time.as_ref().map(format_utc),
            current_time: format_utc(&now),
            monitoring_duration: start_time
                .map(|start| format_duration(now - start))
                .unwrap_or_else(|| "Not started".to_string()),
            monitored_address: config.monitored_address().clone(),
        },
        token_info: TokenInfo {
            base_token: TokenEntry {
                symbol: config.base_token().to_string(),
                address: config.base_token_address().cloned(),
            },
            quote_token: TokenEntry {
                symbol: config.quote_token().to_string(),
                address: config.quote_token_address().cloned(),
            },
        },
        dex_contracts: config.dex_contracts().clone(),
        statistics: Statistics {
            total_transactions: monitoring.total_transactions(),
            abnormal_transactions: monitoring.abnormal_transactions(),
            abnormal_percentage: format_percentage(monitoring.abnormal_ratio()),
        },
        recent_abnormal_transactions: record.abnormal_txs.recent(RECENT_ABNORMAL_LIMIT),
    }
}

fn format_percentage(ratio: Option<f64>) -> String {
    match ratio {
        Some(ratio) => format!("{:.2}%", ratio * 100.0),
        None => "0%".to_string(),
    }
}

/// `H:MM:SS`, prefixed with `N day(s), ` once a day has passed.
fn format_duration(elapsed: Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    let clock = format!("{hours}:{minutes:02}:{seconds:02}");

    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        n => format!("{n} days, {clock}"),
    }
}
