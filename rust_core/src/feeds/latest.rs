//! "Last request wins" tracking for overlapping reads.
//!
//! Every read gets a generation number. Starting a read aborts the older
//! ones, and a result that still slips through with an old generation is
//! dropped, so a slow read for a previous wallet context can never overwrite
//! the state of the current one.
//!
//! Each read runs in its own task, so a read that panics comes back as a
//! `JoinError` for its generation instead of leaving the feed waiting.

use std::future::Future;
use tokio::task::{JoinError, JoinSet};
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, warn};

pub(crate) struct LatestRead<T> {
    generation: u64,
    pending: bool,
    reads: JoinSet<(u64, Result<T, JoinError>)>,
}

impl<T: Send + 'static> LatestRead<T> {
    pub(crate) fn new() -> Self {
        Self {
            generation: 0,
            pending: false,
            reads: JoinSet::new(),
        }
    }

    /// Start a read that supersedes every earlier one; returns its generation
    pub(crate) fn start<F>(&mut self, read: F) -> u64
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.invalidate();
        let generation = self.generation;
        self.reads.spawn(async move {
            // Aborting this task also aborts the read it is waiting on
            let read = AbortOnDropHandle::new(tokio::spawn(read));
            (generation, read.await)
        });
        self.pending = true;
        generation
    }

    /// Abandon every in-flight read
    pub(crate) fn invalidate(&mut self) {
        self.generation += 1;
        self.pending = false;
        self.reads.abort_all();
    }

    /// Whether the current generation is still in flight
    pub(crate) fn is_pending(&self) -> bool {
        self.pending
    }

    /// Wait for the current read's result; `Err` if the read panicked.
    ///
    /// Never resolves while nothing current is in flight, which makes it
    /// safe to use as a `select!` branch. Cancel safe.
    pub(crate) async fn next_current(&mut self) -> Result<T, JoinError> {
        loop {
            match self.reads.join_next().await {
                Some(Ok((generation, output))) if generation == self.generation => {
                    self.pending = false;
                    return output;
                }
                Some(Ok((generation, _))) => {
                    debug!(
                        "Dropping superseded read (generation {}, current {})",
                        generation, self.generation
                    );
                }
                Some(Err(e)) if e.is_cancelled() => {}
                Some(Err(e)) => warn!("Read wrapper task failed: {}", e),
                None => std::future::pending::<()>().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_newest_read_wins() {
        let mut reads = LatestRead::new();

        reads.start(async {
            sleep(Duration::from_secs(10)).await;
            "slow"
        });
        let current = reads.start(async {
            sleep(Duration::from_secs(1)).await;
            "fast"
        });

        assert_eq!(current, 2);
        assert!(reads.is_pending());
        assert_eq!(reads.next_current().await.unwrap(), "fast");
        assert!(!reads.is_pending());

        // The superseded read was aborted and never surfaces
        let waited = tokio::time::timeout(Duration::from_secs(30), reads.next_current()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_discards_in_flight() {
        let mut reads = LatestRead::new();
        reads.start(async { 42 });
        reads.invalidate();

        assert!(!reads.is_pending());
        let waited = tokio::time::timeout(Duration::from_secs(5), reads.next_current()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_but_unconsumed_old_result_dropped() {
        let mut reads = LatestRead::new();
        reads.start(async { 1 });
        // Let the first read finish before superseding it
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        reads.start(async {
            sleep(Duration::from_millis(5)).await;
            2
        });
        assert_eq!(reads.next_current().await.unwrap(), 2);
    }

    async fn exploding_read() -> u32 {
        panic!("reader blew up")
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_read_reports_failure() {
        let mut reads = LatestRead::new();
        reads.start(exploding_read());

        let result = tokio::time::timeout(Duration::from_secs(5), reads.next_current())
            .await
            .expect("a panicked read must still resolve");
        assert!(result.unwrap_err().is_panic());
        assert!(!reads.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_of_superseded_read_ignored() {
        let mut reads = LatestRead::new();
        reads.start(exploding_read());
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        reads.start(async {
            sleep(Duration::from_millis(5)).await;
            9
        });
        assert_eq!(reads.next_current().await.unwrap(), 9);
    }
}
