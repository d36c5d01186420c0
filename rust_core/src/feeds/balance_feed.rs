//! Native balance feed for the connected EVM wallet.
//!
//! Follows the wallet layer's [`WalletContext`]: whenever the account or the
//! chain changes while an account is connected, one read is issued right
//! away. Reads that belong to an outdated context are discarded.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::latest::LatestRead;
use crate::chains::chain_label;
use crate::clients::balance_reader::{BalanceReader, BALANCE_FETCH_FAILED};
use crate::utils::format::format_balance;
use crate::wallet::WalletContext;

/// Decimal places of a displayed EVM balance
pub const BALANCE_DECIMALS: usize = 4;

/// What consumers see of the wallet balance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceView {
    /// Balance with 4 decimals; `None` when no value is known
    pub balance: Option<String>,
    /// Native token symbol of the active chain
    pub symbol: String,
    /// Display name of the active chain
    pub chain_name: String,
    /// A balance read is in flight
    pub loading: bool,
    /// Message of the last failed read
    pub error: Option<String>,
}

/// Raw outcome of the reads for the active context
#[derive(Debug, Clone, Default)]
struct ReadState {
    value: Option<f64>,
    loading: bool,
    error: Option<String>,
}

impl BalanceView {
    fn derive(context: &WalletContext, read: &ReadState) -> Self {
        let label = chain_label(context.chain_id);
        Self {
            balance: format_balance(read.value, BALANCE_DECIMALS),
            symbol: label.symbol.to_string(),
            chain_name: label.name.to_string(),
            loading: read.loading,
            error: read.error.clone(),
        }
    }
}

/// Reads the connected account's native balance on the active chain
pub struct BalanceFeed {
    reader: Arc<dyn BalanceReader>,
    wallet: watch::Receiver<WalletContext>,
}

impl BalanceFeed {
    pub fn new(reader: Arc<dyn BalanceReader>, wallet: watch::Receiver<WalletContext>) -> Self {
        Self { reader, wallet }
    }

    /// Start following the wallet. Reads immediately if an account is connected.
    pub fn spawn(mut self) -> BalanceFeedHandle {
        let context = *self.wallet.borrow_and_update();
        let initial = ReadState {
            loading: context.account.is_some(),
            ..ReadState::default()
        };

        let (view_tx, view_rx) = watch::channel(BalanceView::derive(&context, &initial));
        let (refetch_tx, refetch_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(self.run(context, view_tx, refetch_rx, cancel.clone()));

        BalanceFeedHandle {
            view: view_rx,
            refetch_tx,
            cancel,
            task: Some(task),
        }
    }

    async fn run(
        self,
        mut context: WalletContext,
        view: watch::Sender<BalanceView>,
        mut refetch_rx: mpsc::UnboundedReceiver<()>,
        cancel: CancellationToken,
    ) {
        let Self { reader, mut wallet } = self;
        let mut reads: LatestRead<anyhow::Result<f64>> = LatestRead::new();
        let mut read = ReadState::default();
        let mut wallet_open = true;

        info!("Balance feed started (chain {})", context.chain_id);

        if let Some(account) = context.account {
            start_read(&mut reads, &reader, account, context.chain_id);
            read.loading = true;
        }

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                changed = wallet.changed(), if wallet_open => {
                    if changed.is_err() {
                        debug!("Wallet session closed; keeping last context");
                        wallet_open = false;
                        continue;
                    }

                    let next = *wallet.borrow_and_update();
                    if next == context {
                        continue;
                    }
                    context = next;

                    // Values from the previous account/chain no longer apply
                    read = ReadState::default();
                    match context.account {
                        Some(account) => {
                            start_read(&mut reads, &reader, account, context.chain_id);
                        }
                        None => reads.invalidate(),
                    }
                    read.loading = reads.is_pending();
                }

                Some(()) = refetch_rx.recv() => {
                    let Some(account) = context.account else {
                        debug!("Balance refetch ignored: no account connected");
                        continue;
                    };
                    start_read(&mut reads, &reader, account, context.chain_id);
                    read.loading = true;
                }

                result = reads.next_current() => {
                    read.loading = false;
                    match result {
                        Ok(Ok(value)) => {
                            read.value = Some(value);
                            read.error = None;
                        }
                        Ok(Err(e)) => {
                            warn!("Error fetching balance on chain {}: {}", context.chain_id, e);
                            read.error = Some(e.to_string());
                        }
                        Err(e) => {
                            error!("Balance read on chain {} crashed: {}", context.chain_id, e);
                            read.error = Some(BALANCE_FETCH_FAILED.to_string());
                        }
                    }
                }
            }

            view.send_replace(BalanceView::derive(&context, &read));
        }

        info!("Balance feed stopped");
    }
}

fn start_read(
    reads: &mut LatestRead<anyhow::Result<f64>>,
    reader: &Arc<dyn BalanceReader>,
    account: ethers::types::Address,
    chain_id: u64,
) {
    let reader = reader.clone();
    let generation = reads.start(async move { reader.native_balance(account, chain_id).await });
    debug!(
        "Balance read #{} for {:?} on chain {}",
        generation, account, chain_id
    );
}

/// Consumer side of a running [`BalanceFeed`]. Dropping it stops the feed.
pub struct BalanceFeedHandle {
    view: watch::Receiver<BalanceView>,
    refetch_tx: mpsc::UnboundedSender<()>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl BalanceFeedHandle {
    /// Copy of the current view
    pub fn view(&self) -> BalanceView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every view change
    pub fn subscribe(&self) -> watch::Receiver<BalanceView> {
        self.view.clone()
    }

    /// Force an immediate re-read for the current account and chain
    pub fn refetch(&self) {
        if self.refetch_tx.send(()).is_err() {
            debug!("Refetch requested on a stopped balance feed");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stop the feed and wait for its task to exit
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Balance feed task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for BalanceFeedHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::WalletSession;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use ethers::types::Address;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Reader with a fixed balance and latency per chain
    struct FakeReader {
        calls: AtomicUsize,
        chains: Mutex<Vec<u64>>,
        balances: HashMap<u64, f64>,
        delays: HashMap<u64, Duration>,
        fail_with: Mutex<Option<String>>,
    }

    impl FakeReader {
        fn new(balances: &[(u64, f64)]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                chains: Mutex::new(Vec::new()),
                balances: balances.iter().copied().collect(),
                delays: HashMap::new(),
                fail_with: Mutex::new(None),
            }
        }

        fn with_delay(mut self, chain_id: u64, delay: Duration) -> Self {
            self.delays.insert(chain_id, delay);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn fail_next(&self, message: &str) {
            *self.fail_with.lock().unwrap() = Some(message.to_string());
        }
    }

    #[async_trait]
    impl BalanceReader for FakeReader {
        async fn native_balance(&self, _address: Address, chain_id: u64) -> anyhow::Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.chains.lock().unwrap().push(chain_id);
            if let Some(delay) = self.delays.get(&chain_id) {
                tokio::time::sleep(*delay).await;
            }
            if let Some(message) = self.fail_with.lock().unwrap().take() {
                return Err(anyhow!(message));
            }
            Ok(*self.balances.get(&chain_id).unwrap_or(&0.0))
        }
    }

    fn account() -> Address {
        Address::repeat_byte(0xab)
    }

    async fn wait_loaded(rx: &mut watch::Receiver<BalanceView>) -> BalanceView {
        rx.wait_for(|v| !v.loading).await.unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_account_means_absent_balance() {
        let reader = Arc::new(FakeReader::new(&[(1, 2.5)]));
        let session = WalletSession::new(1);
        let handle = BalanceFeed::new(reader.clone(), session.subscribe()).spawn();

        let view = handle.view();
        assert_eq!(view.balance, None);
        assert!(!view.loading);
        assert!(view.error.is_none());
        assert_eq!(view.symbol, "ETH");
        assert_eq!(view.chain_name, "Ethereum");

        handle.refetch();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(reader.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connected_account_read_and_formatted() {
        let reader = Arc::new(FakeReader::new(&[(1, 1.23456789)]));
        let session = WalletSession::new(1);
        session.connect(account());

        let handle = BalanceFeed::new(reader.clone(), session.subscribe()).spawn();
        assert!(handle.view().loading);
        assert_eq!(handle.view().balance, None);

        let mut rx = handle.subscribe();
        let view = wait_loaded(&mut rx).await;
        assert_eq!(view.balance.as_deref(), Some("1.2346"));
        assert!(view.error.is_none());
        assert_eq!(reader.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chain_change_triggers_exactly_one_read() {
        let reader = Arc::new(FakeReader::new(&[(1, 1.0), (137, 250.0)]));
        let session = WalletSession::new(1);
        session.connect(account());

        let handle = BalanceFeed::new(reader.clone(), session.subscribe()).spawn();
        let mut rx = handle.subscribe();
        wait_loaded(&mut rx).await;
        assert_eq!(reader.calls(), 1);

        session.switch_chain(137);
        let view = rx
            .wait_for(|v| v.chain_name == "Polygon" && !v.loading)
            .await
            .unwrap()
            .clone();

        assert_eq!(reader.calls(), 2);
        assert_eq!(*reader.chains.lock().unwrap(), vec![1, 137]);
        assert_eq!(view.symbol, "MATIC");
        assert_eq!(view.balance.as_deref(), Some("250.0000"));

        // Selecting the same chain again is not a change
        session.switch_chain(137);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(reader.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_chain_uses_fallback_label() {
        let reader = Arc::new(FakeReader::new(&[(56, 3.0)]));
        let session = WalletSession::new(56);
        session.connect(account());

        let handle = BalanceFeed::new(reader, session.subscribe()).spawn();
        let mut rx = handle.subscribe();
        let view = wait_loaded(&mut rx).await;

        assert_eq!(view.symbol, "ETH");
        assert_eq!(view.chain_name, "Unknown");
        assert!(view.error.is_none());
        assert_eq!(view.balance.as_deref(), Some("3.0000"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_read_never_overwrites_newer_chain() {
        let reader = Arc::new(
            FakeReader::new(&[(1, 1.0), (8453, 8.0)]).with_delay(1, Duration::from_secs(10)),
        );
        let session = WalletSession::new(1);
        session.connect(account());

        let handle = BalanceFeed::new(reader.clone(), session.subscribe()).spawn();
        let mut rx = handle.subscribe();

        // Mainnet read is still in flight when the user switches to Base
        while reader.calls() == 0 {
            tokio::task::yield_now().await;
        }
        session.switch_chain(8453);

        let view = rx
            .wait_for(|v| v.chain_name == "Base" && !v.loading)
            .await
            .unwrap()
            .clone();
        assert_eq!(view.balance.as_deref(), Some("8.0000"));

        // Let the slow mainnet read's deadline pass
        tokio::time::sleep(Duration::from_secs(30)).await;
        let view = handle.view();
        assert_eq!(view.chain_name, "Base");
        assert_eq!(view.balance.as_deref(), Some("8.0000"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_error_passed_through_verbatim() {
        let reader = Arc::new(FakeReader::new(&[(1, 4.0)]));
        let session = WalletSession::new(1);
        session.connect(account());

        let handle = BalanceFeed::new(reader.clone(), session.subscribe()).spawn();
        let mut rx = handle.subscribe();
        wait_loaded(&mut rx).await;

        reader.fail_next("execution reverted: rate limited");
        handle.refetch();
        let view = rx
            .wait_for(|v| v.error.is_some())
            .await
            .unwrap()
            .clone();

        assert_eq!(view.error.as_deref(), Some("execution reverted: rate limited"));
        // Last known value for the same context stays visible
        assert_eq!(view.balance.as_deref(), Some("4.0000"));
        assert!(!view.loading);

        handle.refetch();
        let view = rx.wait_for(|v| v.error.is_none()).await.unwrap().clone();
        assert_eq!(view.balance.as_deref(), Some("4.0000"));
        assert_eq!(reader.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_clears_balance() {
        let reader = Arc::new(FakeReader::new(&[(1, 2.0)]));
        let session = WalletSession::new(1);
        session.connect(account());

        let handle = BalanceFeed::new(reader, session.subscribe()).spawn();
        let mut rx = handle.subscribe();
        assert_eq!(wait_loaded(&mut rx).await.balance.as_deref(), Some("2.0000"));

        session.disconnect();
        let view = rx.wait_for(|v| v.balance.is_none()).await.unwrap().clone();
        assert!(!view.loading);
        assert!(view.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_after_start_triggers_read() {
        let reader = Arc::new(FakeReader::new(&[(10, 0.5)]));
        let session = WalletSession::new(10);

        let handle = BalanceFeed::new(reader.clone(), session.subscribe()).spawn();
        let mut rx = handle.subscribe();

        session.connect(account());
        let view = rx
            .wait_for(|v| v.balance.is_some())
            .await
            .unwrap()
            .clone();
        assert_eq!(view.balance.as_deref(), Some("0.5000"));
        assert_eq!(view.chain_name, "Optimism");
        assert_eq!(reader.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_updates() {
        let reader = Arc::new(FakeReader::new(&[(1, 1.0), (137, 2.0)]));
        let session = WalletSession::new(1);
        session.connect(account());

        let handle = BalanceFeed::new(reader.clone(), session.subscribe()).spawn();
        let mut rx = handle.subscribe();
        wait_loaded(&mut rx).await;

        handle.shutdown().await;
        session.switch_chain(137);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(reader.calls(), 1);
        assert_eq!(rx.borrow().chain_name, "Ethereum");
    }

    struct CrashingReader;

    #[async_trait]
    impl BalanceReader for CrashingReader {
        async fn native_balance(&self, _address: Address, _chain_id: u64) -> anyhow::Result<f64> {
            panic!("reader crashed");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashed_read_ends_loading_with_error() {
        let session = WalletSession::new(1);
        session.connect(account());

        let handle = BalanceFeed::new(Arc::new(CrashingReader), session.subscribe()).spawn();
        let mut rx = handle.subscribe();

        let view = tokio::time::timeout(Duration::from_secs(60), wait_loaded(&mut rx))
            .await
            .expect("loading must end after a crashed read");
        assert!(view.balance.is_none());
        assert_eq!(view.error.as_deref(), Some("Failed to fetch balance"));
        assert!(handle.is_running());
    }
}

