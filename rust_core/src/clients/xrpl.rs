//! XRP Ledger JSON-RPC balance client
//!
//! Reads XRP balances with `account_info` against the latest validated
//! ledger. Unfunded accounts come back as `actNotFound`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::balance_reader::{Ledger, LedgerBalanceReader, LedgerError};
use crate::utils::format::drops_to_xrp;

/// Public full-history cluster
pub const DEFAULT_RPC_URL: &str = "https://xrplcluster.com";

/// XRPL RPC client
pub struct XrplClient {
    client: Client,
    rpc_url: String,
}

#[derive(Debug, Deserialize)]
struct AccountInfoResponse {
    result: AccountInfoResult,
}

#[derive(Debug, Deserialize)]
struct AccountInfoResult {
    #[serde(default)]
    account_data: Option<AccountData>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    /// Balance in drops, as a decimal string
    #[serde(rename = "Balance")]
    balance: String,
}

impl XrplClient {
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_RPC_URL, Duration::from_secs(30))
    }

    pub fn with_config(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
        })
    }

    /// Balance in drops
    pub async fn get_balance_drops(&self, address: &str) -> Result<u64, LedgerError> {
        let request = json!({
            "method": "account_info",
            "params": [{
                "account": address,
                "ledger_index": "validated"
            }]
        });

        debug!("Fetching XRP balance for {}", address);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "XRPL RPC returned HTTP {}",
                response.status()
            )));
        }

        let body: AccountInfoResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Rpc(format!("Failed to parse account_info response: {}", e)))?;

        match body.result.error.as_deref() {
            Some("actNotFound") => return Err(LedgerError::AccountNotActivated),
            Some("actMalformed") => return Err(LedgerError::InvalidAddress(address.to_string())),
            Some(other) => {
                let detail = body.result.error_message.unwrap_or_default();
                return Err(LedgerError::Rpc(format!("{} {}", other, detail).trim().to_string()));
            }
            None => {}
        }

        let data = body
            .result
            .account_data
            .ok_or_else(|| LedgerError::Rpc("account_info response without account_data".to_string()))?;

        data.balance
            .parse::<u64>()
            .map_err(|_| LedgerError::Rpc(format!("Invalid drops balance: {}", data.balance)))
    }
}

#[async_trait]
impl LedgerBalanceReader for XrplClient {
    fn ledger(&self) -> Ledger {
        Ledger::Xrpl
    }

    async fn balance(&self, address: &str) -> Result<f64, LedgerError> {
        let drops = self.get_balance_drops(address).await?;
        Ok(drops_to_xrp(drops))
    }
}
