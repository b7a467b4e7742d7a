//! Startup gate: both chain endpoints must answer a liveness query.
//!
//! Each chain is probed on its own retry clock; a slow chain A never stalls
//! chain B's attempts. Startup proceeds only once both are ready, and fails
//! only when a probing round ends with neither chain ready.

use std::time::Duration;

use eyre::{eyre, Result};
use tracing::{debug, info, warn};

use crate::client::ChainClient;

#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    /// Probe attempts per chain per round.
    pub max_attempts: u32,
    /// Delay between probe attempts.
    pub retry_delay: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Block until both chains answer their network-identity query.
///
/// Returns an error only when neither chain became ready within its budget;
/// if one chain is up, the other keeps getting fresh rounds.
pub async fn wait_for_chains(
    chain_a: &dyn ChainClient,
    chain_b: &dyn ChainClient,
    config: &ReadinessConfig,
) -> Result<()> {
    info!("Waiting for chains to be ready");

    let mut ready_a = false;
    let mut ready_b = false;

    loop {
        let (round_a, round_b) = tokio::join!(
            probe_until_ready("chain-a", chain_a, config, ready_a),
            probe_until_ready("chain-b", chain_b, config, ready_b),
        );
        ready_a |= round_a;
        ready_b |= round_b;

        if ready_a && ready_b {
            return Ok(());
        }
        if !ready_a && !ready_b {
            return Err(eyre!(
                "Neither chain became ready within {} attempts",
                config.max_attempts
            ));
        }

        warn!(
            chain_a_ready = ready_a,
            chain_b_ready = ready_b,
            "One chain still not ready, retrying with a fresh budget"
        );
    }
}

async fn probe_until_ready(
    name: &str,
    client: &dyn ChainClient,
    config: &ReadinessConfig,
    already_ready: bool,
) -> bool {
    if already_ready {
        return true;
    }

    for attempt in 1..=config.max_attempts {
        match client.chain_id().await {
            Ok(chain_id) => {
                info!(chain = name, chain_id, "Chain is ready");
                return true;
            }
            Err(e) => {
                debug!(
                    chain = name,
                    attempt,
                    max_attempts = config.max_attempts,
                    error = %e,
                    "Chain not ready yet"
                );
                tokio::time::sleep(config.retry_delay).await;
            }
        }
    }

    warn!(chain = name, "Chain did not become ready within retry budget");
    false
}
