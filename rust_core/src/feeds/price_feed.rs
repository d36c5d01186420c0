//! Periodic spot-price feed.
//!
//! Polls a [`PriceSource`] once at start and then on a fixed interval,
//! publishing every state transition through a `watch` channel. A failed
//! fetch keeps the previous snapshot and surfaces a fixed error message until
//! the next successful fetch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clients::price_source::PriceSource;
use crate::types::PriceSnapshot;

/// Price feed configuration
#[derive(Debug, Clone)]
pub struct PriceFeedConfig {
    /// Fixed polling interval
    pub interval: Duration,
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// Published state of a price feed
#[derive(Debug, Clone, PartialEq)]
pub struct PriceFeedState {
    /// Latest successful snapshot, `None` until the first success
    pub prices: Option<PriceSnapshot>,
    /// A fetch is in flight
    pub loading: bool,
    /// Message of the most recent failure, cleared by the next success
    pub error: Option<String>,
    /// Fetch attempts finished so far (success or failure)
    pub completed_fetches: u64,
}

impl PriceFeedState {
    fn initial() -> Self {
        Self {
            prices: None,
            loading: true,
            error: None,
            completed_fetches: 0,
        }
    }
}

/// Polls a price source on a fixed schedule
pub struct PriceFeed {
    source: Arc<dyn PriceSource>,
    config: PriceFeedConfig,
}

impl PriceFeed {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self {
            source,
            config: PriceFeedConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PriceFeedConfig) -> Self {
        self.config = config;
        self
    }

    /// Start polling. The first fetch is issued immediately.
    pub fn spawn(self) -> PriceFeedHandle {
        let (state_tx, state_rx) = watch::channel(PriceFeedState::initial());
        let (refetch_tx, refetch_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(self.run(state_tx, refetch_rx, cancel.clone()));

        PriceFeedHandle {
            state: state_rx,
            refetch_tx,
            cancel,
            task: Some(task),
        }
    }

    async fn run(
        self,
        state: watch::Sender<PriceFeedState>,
        mut refetch_rx: mpsc::UnboundedReceiver<()>,
        cancel: CancellationToken,
    ) {
        info!(
            "Price feed started ({}, every {}s)",
            self.source.source_name(),
            self.config.interval.as_secs()
        );

        // First tick completes immediately
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = ticker.tick() => {
                    debug!("Scheduled price fetch");
                }

                Some(()) = refetch_rx.recv() => {
                    debug!("Manual price refetch");
                }
            }

            if !self.fetch_once(&state, &cancel).await {
                break;
            }
        }

        info!("Price feed stopped ({})", self.source.source_name());
    }

    /// Run one fetch and publish its outcome. Returns false if cancelled
    /// while the request was in flight; nothing is published in that case.
    async fn fetch_once(
        &self,
        state: &watch::Sender<PriceFeedState>,
        cancel: &CancellationToken,
    ) -> bool {
        state.send_modify(|s| s.loading = true);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            result = self.source.fetch_snapshot() => result,
        };

        state.send_modify(|s| {
            match result {
                Ok(snapshot) => {
                    debug!(
                        "Prices updated: ETH ${:.2}, MATIC ${:.4}, SOL ${:.2}, XRP ${:.4}",
                        snapshot.ethereum, snapshot.matic_network, snapshot.solana, snapshot.ripple
                    );
                    s.prices = Some(snapshot);
                    s.error = None;
                }
                Err(e) => {
                    warn!("Error fetching crypto prices from {}: {}", self.source.source_name(), e);
                    s.error = Some(e.user_message().to_string());
                }
            }
            s.loading = false;
            s.completed_fetches += 1;
        });

        true
    }
}

/// Consumer side of a running [`PriceFeed`].
///
/// Dropping the handle stops the feed; [`PriceFeedHandle::shutdown`] also
/// waits for the task to finish.
pub struct PriceFeedHandle {
    state: watch::Receiver<PriceFeedState>,
    refetch_tx: mpsc::UnboundedSender<()>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PriceFeedHandle {
    /// Copy of the current state
    pub fn state(&self) -> PriceFeedState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<PriceFeedState> {
        self.state.clone()
    }

    /// Queue one immediate fetch, independent of the schedule
    pub fn refetch(&self) {
        if self.refetch_tx.send(()).is_err() {
            debug!("Refetch requested on a stopped price feed");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stop polling and wait for the feed task to exit
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Price feed task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PriceFeedHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
