//! Wires the feeds to their upstreams and logs every published state.

use std::fmt::Debug;
use std::sync::Arc;

use anyhow::{Context, Result};
use creator_feeds_core::clients::{CoinGeckoClient, EvmBalanceClient, SolanaRpcClient, XrplClient};
use creator_feeds_core::feeds::{
    BalanceFeed, BalanceFeedHandle, LedgerBalanceFeed, LedgerBalanceHandle, PriceFeed,
    PriceFeedConfig, PriceFeedHandle,
};
use creator_feeds_core::{chain_label, WalletSession};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;

/// All running feeds plus the inputs they follow
pub struct FeedMonitor {
    prices: PriceFeedHandle,
    balance: BalanceFeedHandle,
    sol: LedgerBalanceHandle,
    xrp: LedgerBalanceHandle,

    // Kept alive so the feeds keep their inputs
    wallet: WalletSession,
    _sol_address: watch::Sender<Option<String>>,
    _xrp_address: watch::Sender<Option<String>>,

    loggers: Vec<JoinHandle<()>>,
}

impl FeedMonitor {
    /// Build the clients once and spawn every feed
    pub fn start(config: &Config) -> Result<Self> {
        let timeout = config.http_timeout();

        let price_client =
            CoinGeckoClient::with_config(config.price_api_base_url.clone(), timeout)
                .context("Failed to initialize CoinGeckoClient")?;
        let evm_client = EvmBalanceClient::with_overrides(&config.evm_rpc_urls, timeout)
            .context("Failed to initialize EvmBalanceClient")?;
        let sol_client = SolanaRpcClient::with_config(config.solana_rpc_url.clone(), timeout)
            .context("Failed to initialize SolanaRpcClient")?;
        let xrp_client = XrplClient::with_config(config.xrpl_rpc_url.clone(), timeout)
            .context("Failed to initialize XrplClient")?;

        info!("EVM balance reads enabled for chains {:?}", evm_client.chain_ids());

        let wallet = WalletSession::new(config.wallet_chain_id);
        if let Some(account) = config.wallet_address {
            wallet.connect(account);
        }
        let label = chain_label(config.wallet_chain_id);
        info!(
            "Wallet chain: {} ({}, {})",
            config.wallet_chain_id, label.name, label.symbol
        );

        let (sol_address, sol_rx) = watch::channel(config.solana_address.clone());
        let (xrp_address, xrp_rx) = watch::channel(config.xrp_address.clone());

        let prices = PriceFeed::new(Arc::new(price_client))
            .with_config(PriceFeedConfig {
                interval: config.price_poll_interval(),
            })
            .spawn();
        let balance = BalanceFeed::new(Arc::new(evm_client), wallet.subscribe()).spawn();
        let sol = LedgerBalanceFeed::new(Arc::new(sol_client), sol_rx).spawn();
        let xrp = LedgerBalanceFeed::new(Arc::new(xrp_client), xrp_rx).spawn();

        let loggers = vec![
            log_changes("prices", prices.subscribe()),
            log_changes("evm_balance", balance.subscribe()),
            log_changes("sol_balance", sol.subscribe()),
            log_changes("xrp_balance", xrp.subscribe()),
        ];

        Ok(Self {
            prices,
            balance,
            sol,
            xrp,
            wallet,
            _sol_address: sol_address,
            _xrp_address: xrp_address,
            loggers,
        })
    }

    /// Stop every feed, then wait for the loggers to drain
    pub async fn shutdown(self) {
        info!(
            "Stopping feeds (wallet context: {:?})",
            self.wallet.current()
        );

        self.prices.shutdown().await;
        self.balance.shutdown().await;
        self.sol.shutdown().await;
        self.xrp.shutdown().await;

        for logger in self.loggers {
            if let Err(e) = logger.await {
                warn!("Feed logger ended abnormally: {}", e);
            }
        }
    }
}

/// Log each state a feed publishes until the feed stops
fn log_changes<T>(feed: &'static str, mut rx: watch::Receiver<T>) -> JoinHandle<()>
where
    T: Debug + Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let initial = rx.borrow_and_update().clone();
        info!("[{}] {:?}", feed, initial);
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            info!("[{}] {:?}", feed, state);
        }
    })
}
