use std::time::Duration;

use async_trait::async_trait;
use pairwatch_domain::model::Address;
use reqwest::header::ACCEPT;

use crate::worker::MonitorError;

mod types;

pub use types::{AddressRef, ExplorerTransaction, TransactionPage};

/// Asks the explorer for transactions where the address is sender or
/// recipient.
const ADDRESS_FILTER: &str = "to | from";

#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Latest page of transactions touching `address`, newest first.
    async fn fetch_transactions(&self, address: &Address) -> Result<TransactionPage, MonitorError>;
}

/// Blockscout-style explorer REST client.
pub struct ExplorerClient {
    http: reqwest::Client,
    base_url: String,
}

impl ExplorerClient {
    /// `timeout` bounds each request end to end; a hung explorer only stalls
    /// the current cycle.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MonitorError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn transactions_url(&self, address: &Address) -> String {
        format!("{}/addresses/{}/transactions", self.base_url, address)
    }
}

#[async_trait]
impl TransactionSource for ExplorerClient {
    async fn fetch_transactions(&self, address: &Address) -> Result<TransactionPage, MonitorError> {
        let body = self
            .http
            .get(self.transactions_url(address))
            .query(&[("filter", ADDRESS_FILTER)])
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        parse_page(&body)
    }
}

fn parse_page(body: &[u8]) -> Result<TransactionPage, MonitorError> {
    serde_json::from_slice(body)
        .map_err(|err| MonitorError::Fetch(format!("unexpected explorer payload: {err}")))
}
