//! Price Source Trait
//!
//! Defines the interface the price feed polls. The production implementation
//! is [`CoinGeckoClient`](super::coingecko::CoinGeckoClient); tests plug in
//! scripted sources.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::PriceSnapshot;

/// Message shown to consumers for any failed price fetch
pub const PRICE_FETCH_FAILED: &str = "Failed to fetch prices";

/// Why a price fetch failed.
///
/// All variants are one failure class for consumers (see
/// [`PRICE_FETCH_FAILED`]); the detail only goes to the logs.
#[derive(Debug, Error)]
pub enum PriceFetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl PriceFetchError {
    /// User-facing message for this failure
    pub fn user_message(&self) -> &'static str {
        PRICE_FETCH_FAILED
    }
}

/// Source of multi-asset spot price snapshots
///
/// Implementations must be Send + Sync; the feed holds them behind an `Arc`.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Display name for logging (e.g., "CoinGecko")
    fn source_name(&self) -> &str;

    /// Fetch one snapshot of all tracked assets
    async fn fetch_snapshot(&self) -> Result<PriceSnapshot, PriceFetchError>;
}
