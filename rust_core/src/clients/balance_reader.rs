//! Balance Reader Traits
//!
//! Two seams for wallet balances:
//! - [`BalanceReader`]: EVM native balance keyed by account and chain id
//! - [`LedgerBalanceReader`]: address-keyed balance on a single non-EVM ledger

use async_trait::async_trait;
use ethers::types::Address;
use thiserror::Error;

/// Reads the native-token balance of an EVM account
#[async_trait]
pub trait BalanceReader: Send + Sync {
    /// Balance of `address` on `chain_id`, in whole tokens (ether, not wei).
    ///
    /// Errors are shown to users verbatim, so keep messages readable.
    async fn native_balance(&self, address: Address, chain_id: u64) -> anyhow::Result<f64>;
}

/// Non-EVM ledgers with address-keyed balance reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ledger {
    Solana,
    Xrpl,
}

impl Ledger {
    pub fn symbol(&self) -> &'static str {
        match self {
            Ledger::Solana => "SOL",
            Ledger::Xrpl => "XRP",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ledger::Solana => "Solana",
            Ledger::Xrpl => "XRP Ledger",
        }
    }

    /// Decimal places used when displaying a balance
    pub fn display_decimals(&self) -> usize {
        match self {
            Ledger::Solana => 4,
            Ledger::Xrpl => 2,
        }
    }
}

/// Message shown for a balance read that failed without a more specific cause
pub const BALANCE_FETCH_FAILED: &str = "Failed to fetch balance";

/// Failure of a ledger balance read
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("account not activated")]
    AccountNotActivated,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("rpc error: {0}")]
    Rpc(String),
}

impl LedgerError {
    /// User-facing message for this failure
    pub fn user_message(&self) -> &'static str {
        match self {
            LedgerError::InvalidAddress(_) => "Invalid address",
            LedgerError::AccountNotActivated => "Account not activated",
            LedgerError::Transport(_) | LedgerError::Rpc(_) => BALANCE_FETCH_FAILED,
        }
    }
}

/// Reads the balance of an address on one ledger
#[async_trait]
pub trait LedgerBalanceReader: Send + Sync {
    /// Which ledger this reader talks to
    fn ledger(&self) -> Ledger;

    /// Balance of `address` in whole tokens (SOL, XRP)
    async fn balance(&self, address: &str) -> Result<f64, LedgerError>;
}
