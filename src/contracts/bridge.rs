//! Bridge and governance contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the four
//! contracts the relayer consumes.

use alloy::sol;

sol! {
    /// Chain A lock contract: escrows native tokens and releases them when
    /// the wrapped supply is burned on chain B.
    #[sol(rpc)]
    contract BridgeLock {
        /// Emitted when a user locks tokens for bridging.
        event Locked(address indexed user, uint256 amount, uint256 nonce);

        /// Release escrowed tokens after the matching burn on chain B.
        function unlock(address user, uint256 amount, uint256 nonce) external;

        /// Halt new locks.
        function pause() external;

        /// The contract's own replay guard, keyed by source nonce.
        function processedNonces(uint256 nonce) external view returns (bool);
    }

    /// Chain B mint contract: mints wrapped tokens against chain A locks.
    #[sol(rpc)]
    contract BridgeMint {
        /// Emitted when a user burns wrapped tokens to exit back to chain A.
        event Burned(address indexed user, uint256 amount, uint256 nonce);

        /// Mint wrapped tokens for a lock observed on chain A.
        function mintWrapped(address user, uint256 amount, uint256 nonce) external;

        /// The contract's own replay guard, keyed by source nonce.
        function processedNonces(uint256 nonce) external view returns (bool);
    }

    /// Chain B governance: announces passed proposals.
    #[sol(rpc)]
    contract GovernanceVoting {
        event ProposalPassed(uint256 indexed proposalId, bytes data);
    }

    /// Chain A emergency module: pauses the bridge when governance says so.
    #[sol(rpc)]
    contract GovernanceEmergency {
        function pauseBridge() external;
    }
}
