//! Solana JSON-RPC balance client
//!
//! Reads SOL balances with `getBalance` at `confirmed` commitment.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::balance_reader::{Ledger, LedgerBalanceReader, LedgerError};
use crate::utils::format::lamports_to_sol;

/// Public mainnet-beta endpoint
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// JSON-RPC "invalid params" code, returned for malformed public keys
const INVALID_PARAMS: i64 = -32602;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Solana RPC client
pub struct SolanaRpcClient {
    client: Client,
    rpc_url: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct BalanceResult {
    value: u64,
}

impl SolanaRpcClient {
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

    /// Cheap shape check of a base58 public key (32 bytes encode to 32..=44 chars)
    pub fn is_valid_address(address: &str) -> bool {
        (32..=44).contains(&address.len()) && address.chars().all(|c| BASE58_ALPHABET.contains(c))
    }

    /// Balance in lamports
    pub async fn get_balance_lamports(&self, address: &str) -> Result<u64, LedgerError> {
        if !Self::is_valid_address(address) {
            return Err(LedgerError::InvalidAddress(address.to_string()));
        }

        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getBalance",
            "params": [address, {"commitment": "confirmed"}]
        });

        debug!("Fetching SOL balance for {}", address);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "Solana RPC returned HTTP {}",
                response.status()
            )));
        }

        let body: RpcResponse<BalanceResult> = response
            .json()
            .await
            .map_err(|e| LedgerError::Rpc(format!("Failed to parse getBalance response: {}", e)))?;

        if let Some(error) = body.error {
            if error.code == INVALID_PARAMS {
                return Err(LedgerError::InvalidAddress(address.to_string()));
            }
            return Err(LedgerError::Rpc(format!("{} ({})", error.message, error.code)));
        }

        body.result
            .map(|r| r.value)
            .ok_or_else(|| LedgerError::Rpc("getBalance response without result".to_string()))
    }
}

#[async_trait]
impl LedgerBalanceReader for SolanaRpcClient {
    fn ledger(&self) -> Ledger {
        Ledger::Solana
    }

    async fn balance(&self, address: &str) -> Result<f64, LedgerError> {
        let lamports = self.get_balance_lamports(address).await?;
        Ok(lamports_to_sol(lamports))
    }
}
