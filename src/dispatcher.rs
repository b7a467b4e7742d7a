//! Per-event-kind dispatch.
//!
//! Each handler runs the same state machine: ledger check, destination
//! call, confirmation wait, durable record. Any failure short of the record
//! leaves the event unseen from the ledger's perspective, safe to retry on
//! a later overlapping scan.

use std::sync::Arc;

use eyre::Result;
use sqlx::SqlitePool;
use tracing::{debug, error, info};

use crate::client::{ChainClient, SubmitError};
use crate::db::{self, IDEMPOTENT_SETTLEMENT};
use crate::types::{RelayEvent, RelayPayload};

/// Routes events observed on one chain to state-changing calls on the
/// opposite chain.
pub struct Dispatcher {
    db: SqlitePool,
    destination: Arc<dyn ChainClient>,
}

impl Dispatcher {
    pub fn new(db: SqlitePool, destination: Arc<dyn ChainClient>) -> Self {
        Self { db, destination }
    }

    /// Handle one event end to end.
    ///
    /// Submission failures are logged and the event stays unrecorded for a
    /// later scan; ledger failures propagate so a false "processed" state is
    /// never asserted.
    pub async fn handle(&self, event: &RelayEvent) -> Result<()> {
        let relay_key = event.relay_key();
        let chain_id = event.source_chain_id as i64;

        info!(
            kind = event.kind(),
            relay_key = %relay_key,
            source_chain_id = event.source_chain_id,
            block = event.block_number,
            "Handling event"
        );

        if db::has_processed(&self.db, chain_id, &relay_key).await? {
            debug!(relay_key = %relay_key, "Already processed, skipping");
            return Ok(());
        }

        let submission = match &event.payload {
            RelayPayload::Locked {
                user,
                amount,
                nonce,
            } => {
                debug!(user = %user, amount = %amount, nonce = %nonce, "Minting on destination chain");
                self.destination.mint_wrapped(*user, *amount, *nonce).await
            }
            RelayPayload::Burned {
                user,
                amount,
                nonce,
            } => {
                debug!(user = %user, amount = %amount, nonce = %nonce, "Unlocking on destination chain");
                self.destination.unlock(*user, *amount, *nonce).await
            }
            RelayPayload::ProposalPassed { proposal_id, data } => {
                // The payload is opaque: every passed proposal triggers an
                // emergency pause regardless of content.
                debug!(
                    proposal_id = %proposal_id,
                    data = %hex::encode(data),
                    "Executing emergency pause on destination chain"
                );
                self.destination.pause_bridge().await
            }
        };

        match submission {
            Ok(tx_hash) => {
                db::mark_processed(&self.db, chain_id, &relay_key, &tx_hash).await?;
                info!(relay_key = %relay_key, tx_hash = %tx_hash, "Event relayed");
            }
            Err(SubmitError::AlreadyProcessed) => {
                db::mark_processed(&self.db, chain_id, &relay_key, IDEMPOTENT_SETTLEMENT).await?;
                info!(
                    relay_key = %relay_key,
                    "Destination replay guard already applied action, recorded as processed"
                );
            }
            Err(SubmitError::Other(e)) => {
                error!(
                    relay_key = %relay_key,
                    error = %e,
                    "Destination call failed, event left unprocessed for retry"
                );
            }
        }

        Ok(())
    }
}
