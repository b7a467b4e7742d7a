//! Per-chain pipelines: recovery scan, then live tail.
//!
//! Each chain gets one pipeline owning that chain's cursor. The cursor is
//! never persisted; recovery rebuilds it on every start by rescanning from
//! the configured start block, which is what closes any gap accumulated
//! during downtime.

use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::client::ChainClient;
use crate::dispatcher::Dispatcher;
use crate::scanner;

/// One chain's scan-and-dispatch pipeline.
pub struct ChainPipeline {
    name: &'static str,
    source: Arc<dyn ChainClient>,
    dispatcher: Dispatcher,
    confirmation_depth: u64,
    /// First block not yet scanned. Monotonically non-decreasing.
    next_block: u64,
}

impl ChainPipeline {
    pub fn new(
        name: &'static str,
        source: Arc<dyn ChainClient>,
        dispatcher: Dispatcher,
        confirmation_depth: u64,
        start_block: u64,
    ) -> Self {
        Self {
            name,
            source,
            dispatcher,
            confirmation_depth,
            next_block: start_block,
        }
    }

    pub fn next_block(&self) -> u64 {
        self.next_block
    }

    /// Scan everything confirmed but not yet scanned, dispatching each event
    /// in emission order.
    ///
    /// The cursor advances only after the fetch succeeded and no handler hit
    /// a ledger failure; an unadvanced cursor makes the next tick retry the
    /// same range, and the ledger deduplicates whatever already completed.
    pub async fn catch_up(&mut self) -> Result<()> {
        let head = self.source.block_number().await?;
        let Some(target) = scanner::confirmed_target(head, self.confirmation_depth) else {
            return Ok(());
        };
        if target < self.next_block {
            return Ok(());
        }

        let events = scanner::scan_range(self.source.as_ref(), self.next_block, target).await?;

        if !events.is_empty() {
            info!(
                chain = self.name,
                from_block = self.next_block,
                to_block = target,
                count = events.len(),
                "Dispatching scanned events"
            );
        }

        // Strictly sequential: one event fully handled before the next, to
        // preserve nonce order and keep one in-flight settlement per chain.
        for event in &events {
            self.dispatcher.handle(event).await?;
        }

        self.next_block = target + 1;
        Ok(())
    }

    /// Startup recovery: drain the historical backlog before live tailing.
    ///
    /// Best effort. A failure leaves the cursor unadvanced and is retried by
    /// the first live tick.
    pub async fn recover(&mut self) {
        info!(
            chain = self.name,
            from_block = self.next_block,
            "Recovery scan starting"
        );
        match self.catch_up().await {
            Ok(()) => info!(
                chain = self.name,
                next_block = self.next_block,
                "Recovery scan complete"
            ),
            Err(e) => warn!(
                chain = self.name,
                error = %e,
                "Recovery scan failed, live tail will retry the range"
            ),
        }
    }

    /// Live tail: poll for new confirmed ranges until shutdown.
    ///
    /// One failed tick never stops the loop; the required range is re-derived
    /// from the unchanged cursor on the next tick.
    pub async fn run(
        mut self,
        poll_interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        info!(
            chain = self.name,
            poll_interval_ms = poll_interval.as_millis() as u64,
            "Live tail loop starting"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!(chain = self.name, "Shutdown signal received, stopping tail loop");
                    return Ok(());
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }

            if let Err(e) = self.catch_up().await {
                error!(
                    chain = self.name,
                    error = %e,
                    "Tail tick failed, range will be retried"
                );
            }
        }
    }
}

/// The whole relayer: two independent pipelines sharing one ledger.
pub struct Relayer {
    pub chain_a: ChainPipeline,
    pub chain_b: ChainPipeline,
}

impl Relayer {
    /// Recovery on both chains, then concurrent live tails until shutdown.
    ///
    /// Recovery must finish (or fail and be logged) before tailing begins so
    /// no "new" block is processed while historical gaps remain unscanned.
    pub async fn run(
        mut self,
        poll_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        self.chain_a.recover().await;
        self.chain_b.recover().await;
        info!("Recovery complete, starting live tail loops");

        let (a, b) = tokio::join!(
            self.chain_a.run(poll_interval, shutdown.clone()),
            self.chain_b.run(poll_interval, shutdown),
        );
        a?;
        b?;
        Ok(())
    }
}
