use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One page of the explorer's address-transactions listing, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionPage {
    pub items: Vec<ExplorerTransaction>,
}

/// The subset of an explorer transaction the monitor reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExplorerTransaction {
    pub hash: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub to: Option<AddressRef>,
    #[serde(default, deserialize_with = "loose_string")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub status: Option<String>,
    #[serde(
        default,
        rename = "gasUsed",
        alias = "gas_used",
        deserialize_with = "loose_string"
    )]
    pub gas_used: Option<String>,
}

/// Destination of a transaction as the explorer labels it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressRef {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub name: Option<String>,
}

// Explorers disagree on whether amounts and gas are strings or numbers.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}
