//! Chain configuration for supported EVM networks.
//!
//! This module provides:
//! - Static display labels (symbol, name) per chain id
//! - Default public JSON-RPC endpoints
//! - The fallback label for chain ids outside the table

/// Configuration for a single EVM chain.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// EIP-155 chain id
    pub chain_id: u64,
    /// Native token symbol (e.g., "ETH", "MATIC")
    pub symbol: &'static str,
    /// Display name (e.g., "Ethereum", "Base")
    pub name: &'static str,
    /// Public JSON-RPC endpoint used when no override is configured
    pub default_rpc_url: &'static str,
}

/// Display label resolved for any chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLabel {
    pub symbol: &'static str,
    pub name: &'static str,
}

/// Label used for chain ids not present in [`CHAIN_CONFIGS`].
pub const UNKNOWN_CHAIN: ChainLabel = ChainLabel {
    symbol: "ETH",
    name: "Unknown",
};

pub const ETHEREUM_MAINNET: u64 = 1;
pub const OPTIMISM: u64 = 10;
pub const POLYGON: u64 = 137;
pub const BASE: u64 = 8453;
pub const ARBITRUM_ONE: u64 = 42161;

/// Static configuration for all supported chains.
pub static CHAIN_CONFIGS: &[ChainConfig] = &[
    ChainConfig {
        chain_id: ETHEREUM_MAINNET,
        symbol: "ETH",
        name: "Ethereum",
        default_rpc_url: "https://eth.merkle.io",
    },
    ChainConfig {
        chain_id: POLYGON,
        symbol: "MATIC",
        name: "Polygon",
        default_rpc_url: "https://polygon-rpc.com",
    },
    ChainConfig {
        chain_id: BASE,
        symbol: "ETH",
        name: "Base",
        default_rpc_url: "https://mainnet.base.org",
    },
    ChainConfig {
        chain_id: ARBITRUM_ONE,
        symbol: "ETH",
        name: "Arbitrum",
        default_rpc_url: "https://arb1.arbitrum.io/rpc",
    },
    ChainConfig {
        chain_id: OPTIMISM,
        symbol: "ETH",
        name: "Optimism",
        default_rpc_url: "https://mainnet.optimism.io",
    },
];

/// Get chain configuration by id.
pub fn get_chain_config(chain_id: u64) -> Option<&'static ChainConfig> {
    CHAIN_CONFIGS.iter().find(|c| c.chain_id == chain_id)
}

/// Resolve the display label for a chain id, falling back to [`UNKNOWN_CHAIN`].
pub fn chain_label(chain_id: u64) -> ChainLabel {
    get_chain_config(chain_id)
        .map(|c| ChainLabel {
            symbol: c.symbol,
            name: c.name,
        })
        .unwrap_or(UNKNOWN_CHAIN)
}

// ============================================================================
// Tests
// ============================================================================
