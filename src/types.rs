//! Decoded cross-chain events and their relay keys.

use alloy::primitives::{Address, U256};

/// Kind-specific payload of a decoded bridge log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayPayload {
    /// Asset locked on chain A; mirrored by a mint on chain B.
    Locked {
        user: Address,
        amount: U256,
        nonce: U256,
    },
    /// Wrapped asset burned on chain B; mirrored by an unlock on chain A.
    Burned {
        user: Address,
        amount: U256,
        nonce: U256,
    },
    /// Governance proposal passed on chain B; triggers an emergency pause
    /// on chain A. The payload bytes are carried opaquely, never decoded.
    ProposalPassed { proposal_id: U256, data: Vec<u8> },
}

/// A decoded log together with its source position.
///
/// Transient: the position is used only to restore emission order within a
/// scanned range and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEvent {
    pub source_chain_id: u64,
    pub block_number: u64,
    pub log_index: u64,
    pub payload: RelayPayload,
}

impl RelayEvent {
    /// Deterministic dedup key: the same source event maps to the same key
    /// across restarts.
    pub fn relay_key(&self) -> String {
        match &self.payload {
            RelayPayload::Locked { nonce, .. } => format!("LOCK-{}", nonce),
            RelayPayload::Burned { nonce, .. } => format!("BURN-{}", nonce),
            RelayPayload::ProposalPassed { proposal_id, .. } => format!("GOV-{}", proposal_id),
        }
    }

    /// Emission-order sort key within one scan.
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }

    pub fn kind(&self) -> &'static str {
        match self.payload {
            RelayPayload::Locked { .. } => "Locked",
            RelayPayload::Burned { .. } => "Burned",
            RelayPayload::ProposalPassed { .. } => "ProposalPassed",
        }
    }
}
