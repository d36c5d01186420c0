//! EVM JSON-RPC balance client
//!
//! Reads native-token balances (`eth_getBalance`) through one ethers
//! provider per supported chain.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::Address;
use ethers::utils::format_ether;
use reqwest::{Client, Url};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::balance_reader::BalanceReader;
use crate::chains::CHAIN_CONFIGS;

/// Native balance reader backed by public (or configured) RPC endpoints
pub struct EvmBalanceClient {
    providers: HashMap<u64, Provider<Http>>,
}

impl EvmBalanceClient {
    /// Create a client using the default endpoint of every supported chain
    pub fn new() -> Result<Self> {
        Self::with_overrides(&HashMap::new(), Duration::from_secs(30))
    }

    /// Create a client, replacing default endpoints with `rpc_overrides`.
    ///
    /// Overrides for chain ids outside the table add extra chains.
    pub fn with_overrides(rpc_overrides: &HashMap<u64, String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let mut endpoints: HashMap<u64, String> = CHAIN_CONFIGS
            .iter()
            .map(|c| (c.chain_id, c.default_rpc_url.to_string()))
            .collect();
        endpoints.extend(rpc_overrides.iter().map(|(id, url)| (*id, url.clone())));

        let mut providers = HashMap::with_capacity(endpoints.len());
        for (chain_id, endpoint) in endpoints {
            let url = Url::parse(&endpoint)
                .with_context(|| format!("Invalid RPC URL for chain {}: {}", chain_id, endpoint))?;
            providers.insert(chain_id, Provider::new(Http::new_with_client(url, http.clone())));
        }

        Ok(Self { providers })
    }

    /// Chain ids this client can read from
    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.providers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl BalanceReader for EvmBalanceClient {
    async fn native_balance(&self, address: Address, chain_id: u64) -> Result<f64> {
        let provider = self
            .providers
            .get(&chain_id)
            .ok_or_else(|| anyhow!("No RPC endpoint configured for chain {}", chain_id))?;

        debug!("Reading native balance of {:?} on chain {}", address, chain_id);

        let wei = provider.get_balance(address, None).await?;
        let ether = format_ether(wei);

        ether
            .parse::<f64>()
            .map_err(|_| anyhow!("Invalid balance value: {}", ether))
    }
}
