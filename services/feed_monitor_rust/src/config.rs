//! Configuration for feed_monitor_rust

use anyhow::{anyhow, Result};
use creator_feeds_core::chains::ETHEREUM_MAINNET;
use creator_feeds_core::clients::{coingecko, solana, xrpl};
use ethers::types::Address;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Price feed
    pub price_api_base_url: String,
    pub price_poll_interval_secs: u64,

    // HTTP
    pub http_timeout_secs: u64,

    // EVM wallet
    pub wallet_address: Option<Address>,
    pub wallet_chain_id: u64,
    pub evm_rpc_urls: HashMap<u64, String>,

    // Solana
    pub solana_rpc_url: String,
    pub solana_address: Option<String>,

    // XRP Ledger
    pub xrpl_rpc_url: String,
    pub xrp_address: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let price_poll_interval_secs = parse_u64("PRICE_POLL_INTERVAL_SECS", 60)?;
        let http_timeout_secs = parse_u64("HTTP_TIMEOUT_SECS", 30)?;

        if price_poll_interval_secs == 0 {
            return Err(anyhow!("PRICE_POLL_INTERVAL_SECS must be > 0"));
        }
        if http_timeout_secs == 0 {
            return Err(anyhow!("HTTP_TIMEOUT_SECS must be > 0"));
        }

        let wallet_address = match optional("WALLET_ADDRESS") {
            Some(raw) => Some(
                raw.parse::<Address>()
                    .map_err(|e| anyhow!("WALLET_ADDRESS is not a valid address: {} ({})", raw, e))?,
            ),
            None => None,
        };

        let evm_rpc_urls = match optional("EVM_RPC_URLS") {
            Some(raw) => parse_rpc_urls(&raw)?,
            None => HashMap::new(),
        };

        Ok(Self {
            price_api_base_url: env::var("PRICE_API_BASE_URL")
                .unwrap_or_else(|_| coingecko::DEFAULT_BASE_URL.to_string()),
            price_poll_interval_secs,

            http_timeout_secs,

            wallet_address,
            wallet_chain_id: parse_u64("WALLET_CHAIN_ID", ETHEREUM_MAINNET)?,
            evm_rpc_urls,

            solana_rpc_url: env::var("SOLANA_RPC_URL")
                .unwrap_or_else(|_| solana::DEFAULT_RPC_URL.to_string()),
            solana_address: optional("SOLANA_ADDRESS"),

            xrpl_rpc_url: env::var("XRPL_RPC_URL")
                .unwrap_or_else(|_| xrpl::DEFAULT_RPC_URL.to_string()),
            xrp_address: optional("XRP_ADDRESS"),
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn price_poll_interval(&self) -> Duration {
        Duration::from_secs(self.price_poll_interval_secs)
    }
}

/// Parse `chain_id=url` pairs separated by commas
fn parse_rpc_urls(raw: &str) -> Result<HashMap<u64, String>> {
    let mut urls = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (chain_id, url) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("EVM_RPC_URLS entry must be chain_id=url: {}", pair))?;
        let chain_id: u64 = chain_id
            .trim()
            .parse()
            .map_err(|_| anyhow!("EVM_RPC_URLS has an invalid chain id: {}", chain_id))?;
        let url = url.trim();
        if url.is_empty() {
            return Err(anyhow!("EVM_RPC_URLS has an empty URL for chain {}", chain_id));
        }
        urls.insert(chain_id, url.to_string());
    }
    Ok(urls)
}

/// Non-empty environment variable, if set
fn optional(var_name: &str) -> Option<String> {
    env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse environment variable as u64 with default fallback
fn parse_u64(var_name: &str, default: u64) -> Result<u64> {
    match env::var(var_name) {
        Ok(val) => val.parse().map_err(|_| anyhow!("{} must be a valid u64", var_name)),
        Err(_) => Ok(default),
    }
}
