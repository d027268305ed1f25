//! Persisted monitoring state shared by the poller and the status reporter.

pub mod timestamp;

use std::{collections::VecDeque, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::MonitorConfig;

/// Maximum number of abnormal transactions kept in the persisted history.
pub const ABNORMAL_HISTORY_LIMIT: usize = 100;

/// Placeholder used when the explorer omits an optional field.
pub const UNKNOWN: &str = "Unknown";

/// On-chain address in canonical (ASCII lowercase) form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        let mut owned = value.into();
        owned.make_ascii_lowercase();
        Self(owned)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against raw explorer output.
    pub fn matches(&self, raw: &str) -> bool {
        self.0.eq_ignore_ascii_case(raw.trim())
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value.to_owned())
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of an abnormal transaction, detached from the explorer payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbnormalRecord {
    pub hash: String,
    #[serde(default = "unknown", deserialize_with = "or_unknown")]
    pub timestamp: String,
    #[serde(default = "unknown", deserialize_with = "or_unknown")]
    pub method: String,
    #[serde(default = "unknown", deserialize_with = "or_unknown")]
    pub to_address: String,
    #[serde(default)]
    pub to_name: Option<String>,
    #[serde(default = "zero", deserialize_with = "or_zero")]
    pub value: String,
    #[serde(default = "unknown", deserialize_with = "or_unknown")]
    pub status: String,
    #[serde(default = "unknown", deserialize_with = "or_unknown")]
    pub gas_used: String,
}

// Older state files carry explorer nulls and raw numbers in these fields.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseField {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Flag(bool),
}

impl From<LooseField> for String {
    fn from(value: LooseField) -> Self {
        match value {
            LooseField::Text(text) => text,
            LooseField::Unsigned(n) => n.to_string(),
            LooseField::Signed(n) => n.to_string(),
            LooseField::Float(n) => n.to_string(),
            LooseField::Flag(flag) => flag.to_string(),
        }
    }
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

fn zero() -> String {
    "0".to_string()
}

fn or_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<LooseField>::deserialize(deserializer)?
        .map(String::from)
        .unwrap_or_else(unknown))
}

fn or_zero<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<LooseField>::deserialize(deserializer)?
        .map(String::from)
        .unwrap_or_else(zero))
}

/// FIFO ring of the most recent abnormal transactions, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AbnormalRecord>", into = "Vec<AbnormalRecord>")]
pub struct AbnormalHistory {
    entries: VecDeque<AbnormalRecord>,
}

impl AbnormalHistory {
    /// Appends a record, evicting the oldest entries beyond the limit.
    pub fn push(&mut self, record: AbnormalRecord) {
        self.entries.push_back(record);
        while self.entries.len() > ABNORMAL_HISTORY_LIMIT {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AbnormalRecord> {
        self.entries.iter()
    }

    /// The newest `count` records, still in chronological order.
    pub fn recent(&self, count: usize) -> Vec<AbnormalRecord> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip).cloned().collect()
    }
}

impl From<Vec<AbnormalRecord>> for AbnormalHistory {
    fn from(records: Vec<AbnormalRecord>) -> Self {
        let mut history = Self::default();
        for record in records {
            history.push(record);
        }
        history
    }
}

impl From<AbnormalHistory> for Vec<AbnormalRecord> {
    fn from(history: AbnormalHistory) -> Self {
        history.entries.into()
    }
}

/// Running counters and the incremental-fetch anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringState {
    #[serde(default, with = "timestamp::option")]
    start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    last_processed_tx: Option<String>,
    #[serde(default)]
    total_transactions: u64,
    #[serde(default)]
    abnormal_transactions: u64,
}

impl MonitoringState {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Stamps the start time if it has never been set. Returns `true` when
    /// the state changed.
    pub fn ensure_started(&mut self, now: DateTime<Utc>) -> bool {
        if self.start_time.is_some() {
            return false;
        }
        self.start_time = Some(now);
        true
    }

    pub fn last_processed_tx(&self) -> Option<&str> {
        self.last_processed_tx.as_deref()
    }

    pub fn advance_high_water_mark(&mut self, hash: impl Into<String>) {
        self.last_processed_tx = Some(hash.into());
    }

    pub fn total_transactions(&self) -> u64 {
        self.total_transactions
    }

    pub fn abnormal_transactions(&self) -> u64 {
        self.abnormal_transactions
    }

    /// Abnormal share of all processed transactions, `None` before the first.
    pub fn abnormal_ratio(&self) -> Option<f64> {
        if self.total_transactions == 0 {
            None
        } else {
            Some(self.abnormal_transactions as f64 / self.total_transactions as f64)
        }
    }
}

/// The whole persisted record: static config, counters and history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub config: MonitorConfig,
    #[serde(default)]
    pub monitoring: MonitoringState,
    #[serde(default)]
    pub abnormal_txs: AbnormalHistory,
}

impl StateRecord {
    /// A zeroed record bound to `config`. The start time stays unset until
    /// the first cycle stamps it.
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            monitoring: MonitoringState::default(),
            abnormal_txs: AbnormalHistory::default(),
        }
    }

    pub fn record_expected(&mut self) {
        self.monitoring.total_transactions += 1;
    }

    pub fn record_abnormal(&mut self, record: AbnormalRecord) {
        self.monitoring.total_transactions += 1;
        self.monitoring.abnormal_transactions += 1;
        self.abnormal_txs.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> MonitorConfig {
        MonitorConfig::new("0xMonitored", "ETH", "MPH").unwrap()
    }

    fn abnormal(hash: &str) -> AbnormalRecord {
        AbnormalRecord {
            hash: hash.to_string(),
            timestamp: "2024-01-01T00:00:00.000000Z".to_string(),
            method: UNKNOWN.to_string(),
            to_address: "0xdead".to_string(),
            to_name: None,
            value: "0".to_string(),
            status: "ok".to_string(),
            gas_used: "21000".to_string(),
        }
    }

    #[test]
    fn address_canonicalizes_case() {
        let address = Address::new("0xAbCdEf");
        assert_eq!(address.as_str(), "0xabcdef");
        assert!(address.matches(" 0XABCDEF "));

        let parsed: Address = serde_json::from_str("\"0xFFee\"").unwrap();
        assert_eq!(parsed.as_str(), "0xffee");
    }

    #[test]
    fn history_evicts_oldest_first() {
        let mut history = AbnormalHistory::default();
        for i in 0..=ABNORMAL_HISTORY_LIMIT {
            history.push(abnormal(&format!("h{i}")));
        }

        assert_eq!(history.len(), ABNORMAL_HISTORY_LIMIT);
        let hashes: Vec<_> = history.iter().map(|r| r.hash.clone()).collect();
        assert!(!hashes.contains(&"h0".to_string()));
        let expected: Vec<_> = (1..=ABNORMAL_HISTORY_LIMIT).map(|i| format!("h{i}")).collect();
        assert_eq!(hashes, expected);
    }

    #[test]
    fn oversized_legacy_history_is_trimmed_on_load() {
        let records: Vec<_> = (0..150).map(|i| abnormal(&format!("h{i}"))).collect();
        let json = serde_json::to_string(&records).unwrap();
        let history: AbnormalHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(history.len(), ABNORMAL_HISTORY_LIMIT);
        assert_eq!(history.iter().next().unwrap().hash, "h50");
    }

    #[test]
    fn recent_returns_newest_in_order() {
        let history: AbnormalHistory = (0..15)
            .map(|i| abnormal(&format!("h{i}")))
            .collect::<Vec<_>>()
            .into();
        let recent: Vec<_> = history.recent(10).into_iter().map(|r| r.hash).collect();
        assert_eq!(recent.first().map(String::as_str), Some("h5"));
        assert_eq!(recent.last().map(String::as_str), Some("h14"));
        assert_eq!(history.recent(50).len(), 15);
    }

    #[test]
    fn counters_stay_consistent() {
        let mut record = StateRecord::new(config());
        record.record_expected();
        record.record_abnormal(abnormal("h1"));
        record.record_abnormal(abnormal("h2"));

        assert_eq!(record.monitoring.total_transactions(), 3);
        assert_eq!(record.monitoring.abnormal_transactions(), 2);
        assert!(
            record.monitoring.abnormal_transactions() <= record.monitoring.total_transactions()
        );
        assert_eq!(record.abnormal_txs.len(), 2);
    }

    #[test]
    fn start_time_is_set_once() {
        let mut state = MonitoringState::default();
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert!(state.ensure_started(first));
        assert!(!state.ensure_started(later));
        assert_eq!(state.start_time(), Some(first));
    }

    #[test]
    fn record_round_trips_start_time_across_offsets() {
        let mut record = StateRecord::new(config());
        let start = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 15).unwrap();
        record.monitoring.ensure_started(start);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"start_time\":\"2024-03-09T12:30:15Z\""));
        let decoded: StateRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.monitoring.start_time(), Some(start));

        let legacy = json.replace("2024-03-09T12:30:15Z", "2024-03-09T12:30:15+00:00");
        let decoded: StateRecord = serde_json::from_str(&legacy).unwrap();
        assert_eq!(decoded.monitoring.start_time(), Some(start));
    }

    #[test]
    fn legacy_record_without_monitoring_is_repaired() {
        let json = serde_json::json!({
            "config": {
                "monitored_address": "0xABC",
                "base_token": "ETH",
                "quote_token": "MPH",
                "token_addresses": {
                    "ETH": "0x5300000000000000000000000000000000000011",
                    "MPH": "0x579C032A137D796f29b14AdEcb58C2E56B14e367"
                },
                "dex_contracts": {}
            }
        });

        let record: StateRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.monitoring, MonitoringState::default());
        assert!(record.abnormal_txs.is_empty());
        assert_eq!(record.config.monitored_address().as_str(), "0xabc");
    }

    #[test]
    fn legacy_abnormal_entry_with_nulls_is_normalized() {
        let json = r#"{
            "hash": "0xold",
            "timestamp": null,
            "method": null,
            "to_address": "0xdead",
            "to_name": null,
            "value": null,
            "status": null,
            "gas_used": 21000
        }"#;
        let record: AbnormalRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.timestamp, UNKNOWN);
        assert_eq!(record.method, UNKNOWN);
        assert_eq!(record.value, "0");
        assert_eq!(record.status, UNKNOWN);
        assert_eq!(record.gas_used, "21000");

        let sparse: AbnormalRecord = serde_json::from_str(r#"{"hash": "0xbare"}"#).unwrap();
        assert_eq!(sparse.to_address, UNKNOWN);
        assert_eq!(sparse.value, "0");
    }

    #[test]
    fn null_start_time_is_accepted() {
        let json = r#"{"start_time": null, "last_processed_tx": "0x1", "total_transactions": 4, "abnormal_transactions": 1}"#;
        let state: MonitoringState = serde_json::from_str(json).unwrap();
        assert_eq!(state.start_time(), None);
        assert_eq!(state.last_processed_tx(), Some("0x1"));
        assert_eq!(state.abnormal_ratio(), Some(0.25));
    }
}
