//! Wallet connection state.
//!
//! Stands in for the wallet-connectivity layer: whoever owns the connection
//! (UI, CLI, config) drives a [`WalletSession`], and feeds subscribe to the
//! resulting stream of [`WalletContext`] values.

use ethers::types::Address;
use tokio::sync::watch;
use tracing::info;

use crate::chains::ETHEREUM_MAINNET;

/// Active account and network as seen by the wallet layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletContext {
    /// Connected account, `None` while disconnected
    pub account: Option<Address>,
    /// Currently selected chain id
    pub chain_id: u64,
}

impl Default for WalletContext {
    fn default() -> Self {
        Self {
            account: None,
            chain_id: ETHEREUM_MAINNET,
        }
    }
}

/// Owner side of the wallet state.
///
/// Only real changes are broadcast; setting the same chain or account twice
/// does not wake subscribers.
#[derive(Debug)]
pub struct WalletSession {
    tx: watch::Sender<WalletContext>,
}

impl WalletSession {
    pub fn new(chain_id: u64) -> Self {
        let (tx, _rx) = watch::channel(WalletContext {
            account: None,
            chain_id,
        });
        Self { tx }
    }

    /// Current wallet context
    pub fn current(&self) -> WalletContext {
        *self.tx.borrow()
    }

    /// Receiver that observes every change of account or chain
    pub fn subscribe(&self) -> watch::Receiver<WalletContext> {
        self.tx.subscribe()
    }

    pub fn connect(&self, account: Address) {
        let changed = self.tx.send_if_modified(|ctx| {
            if ctx.account == Some(account) {
                return false;
            }
            ctx.account = Some(account);
            true
        });
        if changed {
            info!("Wallet connected: {:?}", account);
        }
    }

    pub fn disconnect(&self) {
        let changed = self.tx.send_if_modified(|ctx| ctx.account.take().is_some());
        if changed {
            info!("Wallet disconnected");
        }
    }

    pub fn switch_chain(&self, chain_id: u64) {
        let changed = self.tx.send_if_modified(|ctx| {
            if ctx.chain_id == chain_id {
                return false;
            }
            ctx.chain_id = chain_id;
            true
        });
        if changed {
            info!("Wallet switched to chain {}", chain_id);
        }
    }
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::new(ETHEREUM_MAINNET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_is_disconnected_mainnet() {
        let session = WalletSession::default();
        assert_eq!(session.current(), WalletContext::default());
        assert_eq!(session.current().chain_id, 1);
        assert!(session.current().account.is_none());
    }

    #[test]
    fn test_only_real_changes_notify() {
        let session = WalletSession::new(1);
        let mut rx = session.subscribe();
        rx.mark_unchanged();

        session.switch_chain(1);
        assert!(!rx.has_changed().unwrap());

        session.switch_chain(137);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().chain_id, 137);

        let account = Address::repeat_byte(0x11);
        session.connect(account);
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();

        session.connect(account);
        assert!(!rx.has_changed().unwrap());

        session.disconnect();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().account.is_none());

        session.disconnect();
        assert!(!rx.has_changed().unwrap());
    }
}
