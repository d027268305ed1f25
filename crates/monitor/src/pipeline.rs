use metrics::counter;
use pairwatch_domain::config::MonitorConfig;
use pairwatch_domain::model::{AbnormalRecord, StateRecord, UNKNOWN};
use strum_macros::AsRefStr;
use tracing::warn;

use crate::explorer::ExplorerTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TxClass {
    Expected,
    Abnormal,
}

/// A transaction is expected when it goes to one of the pair's token
/// contracts or to a known DEX router. No destination means abnormal.
pub fn is_expected(tx: &ExplorerTransaction, config: &MonitorConfig) -> bool {
    let Some(to) = tx.to.as_ref() else {
        return false;
    };
    let destination = to.hash.as_str();

    if config
        .dex_contracts()
        .values()
        .any(|router| router.matches(destination))
    {
        return true;
    }

    [config.base_token_address(), config.quote_token_address()]
        .into_iter()
        .flatten()
        .any(|token| token.matches(destination))
}

pub fn classify(tx: &ExplorerTransaction, config: &MonitorConfig) -> TxClass {
    if is_expected(tx, config) {
        TxClass::Expected
    } else {
        TxClass::Abnormal
    }
}

/// The prefix of `page` (newest first) that sits above the high-water mark.
/// The matching transaction itself is excluded; with no mark, or no match on
/// this page, the whole page is new.
pub fn new_transactions<'a>(
    page: &'a [ExplorerTransaction],
    high_water_mark: Option<&str>,
) -> &'a [ExplorerTransaction] {
    let Some(mark) = high_water_mark else {
        return page;
    };
    match page.iter().position(|tx| tx.hash == mark) {
        Some(index) => &page[..index],
        None => page,
    }
}

/// Counts one transaction into `record`, recording and logging it when it is
/// abnormal.
pub fn process_transaction(
    record: &mut StateRecord,
    tx: &ExplorerTransaction,
    config: &MonitorConfig,
) -> TxClass {
    let class = classify(tx, config);
    let class_tag = class.as_ref().to_owned();
    counter!("monitor_transactions_total", "class" => class_tag).increment(1);

    match class {
        TxClass::Expected => record.record_expected(),
        TxClass::Abnormal => {
            let abnormal = abnormal_record(tx);
            warn!(
                hash = %abnormal.hash,
                to_name = abnormal.to_name.as_deref().unwrap_or(UNKNOWN),
                to_address = %abnormal.to_address,
                method = %abnormal.method,
                "abnormal transaction detected"
            );
            record.record_abnormal(abnormal);
        }
    }

    class
}

fn abnormal_record(tx: &ExplorerTransaction) -> AbnormalRecord {
    let or_unknown = |field: &Option<String>| field.clone().unwrap_or_else(|| UNKNOWN.to_string());

    AbnormalRecord {
        hash: tx.hash.clone(),
        timestamp: or_unknown(&tx.timestamp),
        method: or_unknown(&tx.method),
        to_address: tx
            .to
            .as_ref()
            .map(|to| to.hash.clone())
            .filter(|hash| !hash.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        to_name: tx.to.as_ref().and_then(|to| to.name.clone()),
        value: tx.value.clone().unwrap_or_else(|| "0".to_string()),
        status: or_unknown(&tx.status),
        gas_used: or_unknown(&tx.gas_used),
    }
}
