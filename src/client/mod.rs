//! Chain access seam.
//!
//! The relayer talks to each chain through the [`ChainClient`] trait: head
//! and liveness queries, decoded log fetching, and the destination
//! state-changing calls. Production uses the alloy-backed [`EvmChainClient`];
//! tests substitute fakes.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use eyre::Result;

use crate::types::RelayEvent;

pub mod evm;

pub use evm::{ChainContracts, EvmChainClient};

/// Revert reason the dispatcher must recognize verbatim: the destination
/// contract's replay guard already applied this action.
pub const NONCE_ALREADY_PROCESSED: &str = "Nonce already processed";

/// Classified failure of a destination state-changing call.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The destination contract's own replay guard had already applied the
    /// action (e.g. a previous relayer instance submitted successfully but
    /// crashed before recording locally). Treated as success upstream.
    #[error("destination contract already processed this action")]
    AlreadyProcessed,
    /// Any other submission failure: transport error, unexpected revert,
    /// underfunded signer. The event stays unprocessed and is retried.
    #[error(transparent)]
    Other(#[from] eyre::Report),
}

/// Classify a submission failure by its revert reason.
pub fn classify_submit_error(err: eyre::Report) -> SubmitError {
    // {:#} prints the full context chain; the revert reason may sit below
    // the outermost wrap.
    if format!("{:#}", err).contains(NONCE_ALREADY_PROCESSED) {
        SubmitError::AlreadyProcessed
    } else {
        SubmitError::Other(err)
    }
}

/// JSON-RPC-style access to one chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Network-identity query; doubles as the startup liveness probe.
    async fn chain_id(&self) -> Result<u64>;

    /// Current chain head.
    async fn block_number(&self) -> Result<u64>;

    /// Decoded bridge events emitted in the inclusive block range by every
    /// contract this client watches. Order is whatever the node returned;
    /// the scanner restores emission order.
    async fn fetch_events(&self, from_block: u64, to_block: u64) -> Result<Vec<RelayEvent>>;

    /// mintWrapped on this chain's mint contract. Waits for one
    /// confirmation and returns the settlement tx hash.
    async fn mint_wrapped(
        &self,
        user: Address,
        amount: U256,
        nonce: U256,
    ) -> Result<String, SubmitError>;

    /// unlock on this chain's lock contract. Waits for one confirmation.
    async fn unlock(
        &self,
        user: Address,
        amount: U256,
        nonce: U256,
    ) -> Result<String, SubmitError>;

    /// pauseBridge on this chain's emergency contract. Waits for one
    /// confirmation.
    async fn pause_bridge(&self) -> Result<String, SubmitError>;
}
