//! Creator Feeds Core - live crypto prices and wallet balances.
//!
//! This crate provides:
//! - A price feed polling CoinGecko for ETH, MATIC, SOL and XRP in USD
//! - A native balance feed following the connected EVM wallet and chain
//! - Address-keyed balance feeds for Solana and the XRP Ledger
//! - The static EVM chain table used to label balances
//!
//! Every feed runs as its own tokio task and publishes immutable state
//! snapshots through a `tokio::sync::watch` channel.

mod types;

pub mod chains;
pub mod clients;
pub mod feeds;
pub mod utils;
pub mod wallet;

pub use chains::{chain_label, get_chain_config, ChainConfig, ChainLabel};
pub use feeds::{
    BalanceFeed, BalanceFeedHandle, BalanceView, LedgerBalanceFeed, LedgerBalanceHandle,
    LedgerBalanceView, PriceFeed, PriceFeedConfig, PriceFeedHandle, PriceFeedState,
};
pub use types::*;
pub use wallet::{WalletContext, WalletSession};
