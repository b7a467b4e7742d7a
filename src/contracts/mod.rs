pub mod bridge;

pub use bridge::{BridgeLock, BridgeMint, GovernanceEmergency, GovernanceVoting};
