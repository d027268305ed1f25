//! Environment-driven runtime settings plus the immutable monitoring
//! configuration derived from the command line.

use std::{collections::BTreeMap, env, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Address;

pub const DEFAULT_EXPLORER_API_URL: &str = "https://explorer-api.morphl2.io/api/v2";
pub const DEFAULT_STATE_FILE: &str = "transaction_data.json";
pub const DEFAULT_STATUS_BIND_ADDRESS: &str = "0.0.0.0:5000";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Token contracts the monitor knows how to pair, keyed by symbol.
pub const KNOWN_TOKENS: &[(&str, &str)] = &[
    // WETH
    ("ETH", "0x5300000000000000000000000000000000000011"),
    // Morphahaha
    ("MPH", "0x579C032A137D796f29b14AdEcb58C2E56B14e367"),
];

/// DEX router entry points whose interactions count as expected trades.
pub const KNOWN_DEX_CONTRACTS: &[(&str, &str)] = &[
    ("UniversalRouter", "0xb789922D715475F419b7CB47B6155bF7a2ACECD6"),
    ("UniswapV2Router02", "0x81606E6f8aAD6C75c2f383Ea595c2b9f8ce8aE3a"),
];

/// Process-level settings shared by the monitor and the status server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    explorer_api_url: String,
    state_file: String,
    status_bind_address: String,
    http_timeout: Duration,
}

impl BootstrapConfig {
    /// Loads configuration by hydrating `.env` (if present) and reading the
    /// optional process variables. Unset or blank entries fall back to the
    /// defaults; malformed numbers surface as `ConfigError`.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let explorer_api_url = get_optional_var("PAIRWATCH_EXPLORER_API_URL")
            .unwrap_or_else(|| DEFAULT_EXPLORER_API_URL.to_string());
        let state_file = get_optional_var("PAIRWATCH_STATE_FILE")
            .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());
        let status_bind_address = get_optional_var("PAIRWATCH_STATUS_BIND_ADDRESS")
            .unwrap_or_else(|| DEFAULT_STATUS_BIND_ADDRESS.to_string());
        let http_timeout_secs = match get_optional_var("PAIRWATCH_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|source| ConfigError::InvalidNumber {
                    key: "PAIRWATCH_HTTP_TIMEOUT_SECS",
                    source,
                })?
                .max(1),
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            explorer_api_url: explorer_api_url.trim_end_matches('/').to_string(),
            state_file,
            status_bind_address,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }

    pub fn explorer_api_url(&self) -> &str {
        &self.explorer_api_url
    }

    pub fn state_file(&self) -> &str {
        &self.state_file
    }

    pub fn status_bind_address(&self) -> &str {
        &self.status_bind_address
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }
}

/// What is being watched: one address and the token pair whose contracts
/// (plus the known DEX routers) make a transaction "expected".
///
/// Serialized verbatim into the `config` section of the persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    monitored_address: Address,
    base_token: String,
    quote_token: String,
    token_addresses: BTreeMap<String, Address>,
    dex_contracts: BTreeMap<String, Address>,
}

impl MonitorConfig {
    /// Resolves both token symbols against the built-in registry. Unknown
    /// symbols are rejected here so the poll loop never starts half-configured.
    pub fn new(
        monitored_address: &str,
        base_token: &str,
        quote_token: &str,
    ) -> Result<Self, ConfigError> {
        let (base_symbol, base_address) = lookup_token(base_token)?;
        let (quote_symbol, quote_address) = lookup_token(quote_token)?;

        let mut token_addresses = BTreeMap::new();
        token_addresses.insert(base_symbol.to_string(), base_address);
        token_addresses.insert(quote_symbol.to_string(), quote_address);

        let dex_contracts = KNOWN_DEX_CONTRACTS
            .iter()
            .map(|(name, address)| (name.to_string(), Address::new(*address)))
            .collect();

        Ok(Self {
            monitored_address: Address::new(monitored_address.trim()),
            base_token: base_symbol.to_string(),
            quote_token: quote_symbol.to_string(),
            token_addresses,
            dex_contracts,
        })
    }

    pub fn monitored_address(&self) -> &Address {
        &self.monitored_address
    }

    pub fn base_token(&self) -> &str {
        &self.base_token
    }

    pub fn quote_token(&self) -> &str {
        &self.quote_token
    }

    pub fn base_token_address(&self) -> Option<&Address> {
        self.token_addresses.get(&self.base_token)
    }

    pub fn quote_token_address(&self) -> Option<&Address> {
        self.token_addresses.get(&self.quote_token)
    }

    pub fn token_addresses(&self) -> &BTreeMap<String, Address> {
        &self.token_addresses
    }

    pub fn dex_contracts(&self) -> &BTreeMap<String, Address> {
        &self.dex_contracts
    }
}

fn lookup_token(symbol: &str) -> Result<(&'static str, Address), ConfigError> {
    let wanted = symbol.trim();
    KNOWN_TOKENS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(wanted))
        .map(|(known, address)| (*known, Address::new(*address)))
        .ok_or_else(|| ConfigError::UnknownToken {
            symbol: wanted.to_string(),
        })
}

fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("PAIRWATCH_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration, environment parsing or token
/// resolution fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("unknown token symbol `{symbol}`")]
    UnknownToken { symbol: String },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}
