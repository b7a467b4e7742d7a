//! Off-chain relayer bridging two EVM chains.
//!
//! Watches both chains for bridge events behind a confirmation-depth gate,
//! replays the historical backlog on startup, and mirrors each event as a
//! state-changing call on the opposite chain: `Locked` → `mintWrapped`,
//! `Burned` → `unlock`, `ProposalPassed` → `pauseBridge`. A durable
//! SQLite-backed ledger guarantees at-most-one cross-chain action per
//! source event across restarts.

pub mod client;
pub mod config;
pub mod contracts;
pub mod db;
pub mod dispatcher;
pub mod readiness;
pub mod relayer;
pub mod scanner;
pub mod types;
