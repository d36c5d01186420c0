//! Shared price types for the live-data feeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference currency every price is denominated in
pub const REFERENCE_CURRENCY: &str = "usd";

/// Assets tracked by the price feed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    Ethereum,
    Polygon,
    Solana,
    Ripple,
}

impl Asset {
    /// All tracked assets, in request order
    pub const ALL: [Asset; 4] = [Asset::Ethereum, Asset::Polygon, Asset::Solana, Asset::Ripple];

    /// Identifier used by the price API
    pub fn api_id(&self) -> &'static str {
        match self {
            Asset::Ethereum => "ethereum",
            Asset::Polygon => "matic-network",
            Asset::Solana => "solana",
            Asset::Ripple => "ripple",
        }
    }

    /// Ticker symbol for display
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Ethereum => "ETH",
            Asset::Polygon => "MATIC",
            Asset::Solana => "SOL",
            Asset::Ripple => "XRP",
        }
    }

    /// Reverse of [`Asset::api_id`]
    pub fn from_api_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.api_id() == id)
    }
}

/// One published set of spot prices.
///
/// All four prices are always present; an asset the upstream left out is
/// recorded as `0.0`. A snapshot is replaced wholesale on the next successful
/// fetch and never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub ethereum: f64,
    #[serde(rename = "matic-network")]
    pub matic_network: f64,
    pub solana: f64,
    pub ripple: f64,
    /// When the upstream response was received
    pub fetched_at: DateTime<Utc>,
}

impl PriceSnapshot {
    /// Build a snapshot from a `/simple/price` style body:
    /// `{"ethereum": {"usd": 3120.5}, "solana": {"usd": 141.2}, ...}`
    pub fn from_simple_price(body: &serde_json::Value, vs_currency: &str) -> Self {
        let price_of = |asset: Asset| {
            body.get(asset.api_id())
                .and_then(|entry| entry.get(vs_currency))
                .and_then(serde_json::Value::as_f64)
                .filter(|p| p.is_finite() && *p >= 0.0)
                .unwrap_or(0.0)
        };

        Self {
            ethereum: price_of(Asset::Ethereum),
            matic_network: price_of(Asset::Polygon),
            solana: price_of(Asset::Solana),
            ripple: price_of(Asset::Ripple),
            fetched_at: Utc::now(),
        }
    }

    /// Price of a single asset in the reference currency
    pub fn price(&self, asset: Asset) -> f64 {
        match asset {
            Asset::Ethereum => self.ethereum,
            Asset::Polygon => self.matic_network,
            Asset::Solana => self.solana,
            Asset::Ripple => self.ripple,
        }
    }
}
