//! CoinGecko API Client
//!
//! Fetches spot prices for the tracked assets from the public
//! `/simple/price` endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::price_source::{PriceFetchError, PriceSource};
use crate::types::{Asset, PriceSnapshot, REFERENCE_CURRENCY};

/// Public CoinGecko API root
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko API client
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
}

impl CoinGeckoClient {
    /// Create a client for the public API with a 30 second timeout
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_BASE_URL, Duration::from_secs(30))
    }

    /// Create a client for a custom API root (proxies, tests)
    pub fn with_config(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("CreatorHub/1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// URL of the simple price query for the given coin ids
    pub fn simple_price_url(&self, coin_ids: &[&str], vs_currency: &str) -> String {
        format!(
            "{}/simple/price?ids={}&vs_currencies={}",
            self.base_url,
            coin_ids.join(","),
            vs_currency
        )
    }

    /// Raw `/simple/price` body: `{"<coin id>": {"<currency>": price}}`
    pub async fn get_simple_prices(
        &self,
        coin_ids: &[&str],
        vs_currency: &str,
    ) -> Result<serde_json::Value, PriceFetchError> {
        let url = self.simple_price_url(coin_ids, vs_currency);

        debug!("Fetching {} prices from CoinGecko", coin_ids.len());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PriceFetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PriceFetchError::Status(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| PriceFetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    fn source_name(&self) -> &str {
        "CoinGecko"
    }

    async fn fetch_snapshot(&self) -> Result<PriceSnapshot, PriceFetchError> {
        let ids: Vec<&str> = Asset::ALL.iter().map(|a| a.api_id()).collect();
        let body = self.get_simple_prices(&ids, REFERENCE_CURRENCY).await?;

        if !body.is_object() {
            return Err(PriceFetchError::Decode(format!(
                "expected JSON object, got {}",
                body
            )));
        }

        Ok(PriceSnapshot::from_simple_price(&body, REFERENCE_CURRENCY))
    }
}
