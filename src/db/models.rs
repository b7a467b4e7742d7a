//! Ledger row types.

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// One relayed source event.
///
/// Created exactly once, at the moment the destination action is confirmed
/// (or discovered already-applied); never mutated or deleted.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProcessedEvent {
    /// Chain the source event was observed on.
    pub chain_id: i64,
    /// Event kind + source-native identifier, e.g. "LOCK-7".
    pub relay_key: String,
    /// Destination tx hash, or the IDEMPOTENT sentinel.
    pub settlement_ref: String,
    pub created_at: NaiveDateTime,
}
