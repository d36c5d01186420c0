//! Address-keyed balance feed for non-EVM ledgers (Solana, XRP Ledger).

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::latest::LatestRead;
use crate::clients::balance_reader::{LedgerBalanceReader, LedgerError, BALANCE_FETCH_FAILED};
use crate::utils::format::format_balance;

/// What consumers see of a ledger balance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerBalanceView {
    /// Balance with the ledger's display decimals
    pub balance: Option<String>,
    pub symbol: String,
    pub loading: bool,
    /// User-facing message of the last failed read
    pub error: Option<String>,
}

/// Follows an externally supplied address and reads its balance
pub struct LedgerBalanceFeed {
    reader: Arc<dyn LedgerBalanceReader>,
    address: watch::Receiver<Option<String>>,
}

impl LedgerBalanceFeed {
    pub fn new(
        reader: Arc<dyn LedgerBalanceReader>,
        address: watch::Receiver<Option<String>>,
    ) -> Self {
        Self { reader, address }
    }

    pub fn spawn(mut self) -> LedgerBalanceHandle {
        let address = self.address.borrow_and_update().clone();
        let ledger = self.reader.ledger();

        let (view_tx, view_rx) = watch::channel(LedgerBalanceView {
            balance: None,
            symbol: ledger.symbol().to_string(),
            loading: address.is_some(),
            error: None,
        });
        let (refetch_tx, refetch_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(self.run(address, view_tx, refetch_rx, cancel.clone()));

        LedgerBalanceHandle {
            view: view_rx,
            refetch_tx,
            cancel,
            task: Some(task),
        }
    }

    async fn run(
        self,
        mut current: Option<String>,
        view: watch::Sender<LedgerBalanceView>,
        mut refetch_rx: mpsc::UnboundedReceiver<()>,
        cancel: CancellationToken,
    ) {
        let Self {
            reader,
            address: mut address_rx,
        } = self;
        let ledger = reader.ledger();
        let decimals = ledger.display_decimals();
        let mut reads: LatestRead<Result<f64, LedgerError>> = LatestRead::new();
        let mut value: Option<f64> = None;
        let mut address_open = true;

        info!("{} balance feed started", ledger.name());

        if let Some(address) = current.clone() {
            start_read(&mut reads, &reader, address);
        }

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                changed = address_rx.changed(), if address_open => {
                    if changed.is_err() {
                        address_open = false;
                        continue;
                    }

                    let next = address_rx.borrow_and_update().clone();
                    if next == current {
                        continue;
                    }
                    current = next;
                    value = None;

                    match current.clone() {
                        Some(address) => start_read(&mut reads, &reader, address),
                        None => reads.invalidate(),
                    }
                    view.send_modify(|v| {
                        v.balance = None;
                        v.loading = reads.is_pending();
                        v.error = None;
                    });
                }

                Some(()) = refetch_rx.recv() => {
                    let Some(address) = current.clone() else {
                        continue;
                    };
                    start_read(&mut reads, &reader, address);
                    view.send_modify(|v| {
                        v.loading = true;
                        v.error = None;
                    });
                }

                result = reads.next_current() => {
                    let error = match result {
                        Ok(Ok(balance)) => {
                            value = Some(balance);
                            None
                        }
                        Ok(Err(e)) => {
                            warn!("Error fetching {} balance: {}", ledger.symbol(), e);
                            Some(e.user_message().to_string())
                        }
                        Err(e) => {
                            error!("{} balance read crashed: {}", ledger.symbol(), e);
                            Some(BALANCE_FETCH_FAILED.to_string())
                        }
                    };
                    view.send_modify(|v| {
                        v.balance = format_balance(value, decimals);
                        v.loading = false;
                        v.error = error;
                    });
                }
            }
        }

        info!("{} balance feed stopped", ledger.name());
    }
}

fn start_read(
    reads: &mut LatestRead<Result<f64, LedgerError>>,
    reader: &Arc<dyn LedgerBalanceReader>,
    address: String,
) {
    let reader = reader.clone();
    debug!("Reading {} balance for {}", reader.ledger().symbol(), address);
    reads.start(async move { reader.balance(&address).await });
}

/// Consumer side of a running [`LedgerBalanceFeed`]. Dropping it stops the feed.
pub struct LedgerBalanceHandle {
    view: watch::Receiver<LedgerBalanceView>,
    refetch_tx: mpsc::UnboundedSender<()>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl LedgerBalanceHandle {
    pub fn view(&self) -> LedgerBalanceView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LedgerBalanceView> {
        self.view.clone()
    }

    /// Force an immediate re-read for the current address
    pub fn refetch(&self) {
        if self.refetch_tx.send(()).is_err() {
            debug!("Refetch requested on a stopped ledger balance feed");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Ledger balance feed task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for LedgerBalanceHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
