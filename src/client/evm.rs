//! Alloy-backed EVM chain client.
//!
//! One instance per chain, holding the read provider plus the signing key.
//! Which contracts it watches and serves is driven by the deployment record
//! for that chain: chain A carries the lock and emergency contracts, chain B
//! the mint and voting contracts.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::primitives::U256;
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, Log};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolEvent;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use tracing::{debug, info, warn};

use crate::contracts::{BridgeLock, BridgeMint, GovernanceEmergency, GovernanceVoting};
use crate::types::{RelayEvent, RelayPayload};

use super::{classify_submit_error, ChainClient, SubmitError};

/// Contract addresses deployed on one chain.
///
/// Absent contracts simply are not watched; calling an action whose contract
/// is absent is a configuration error surfaced at submission time.
#[derive(Debug, Clone, Default)]
pub struct ChainContracts {
    /// Lock contract (chain A): emits Locked, serves unlock().
    pub bridge_lock: Option<Address>,
    /// Mint contract (chain B): emits Burned, serves mintWrapped().
    pub bridge_mint: Option<Address>,
    /// Voting contract (chain B): emits ProposalPassed.
    pub governance_voting: Option<Address>,
    /// Emergency contract (chain A): serves pauseBridge().
    pub governance_emergency: Option<Address>,
}

/// EVM client for one chain: log fetching plus signed submissions.
pub struct EvmChainClient {
    rpc_url: String,
    provider: RootProvider<Http<Client>>,
    signer: PrivateKeySigner,
    chain_id: u64,
    contracts: ChainContracts,
}

impl EvmChainClient {
    pub fn new(
        rpc_url: &str,
        private_key: &str,
        chain_id: u64,
        contracts: ChainContracts,
    ) -> Result<Self> {
        let url = rpc_url.parse().wrap_err("Failed to parse RPC URL")?;
        let provider = ProviderBuilder::new().on_http(url);

        let signer: PrivateKeySigner = private_key.parse().wrap_err("Invalid private key")?;

        info!(
            chain_id,
            relayer_address = %signer.address(),
            "EVM chain client initialized"
        );

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            provider,
            signer,
            chain_id,
            contracts,
        })
    }

    /// Raw logs for one contract over an inclusive block range.
    async fn contract_logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>> {
        let filter = Filter::new()
            .address(address)
            .from_block(from_block)
            .to_block(to_block);

        self.provider.get_logs(&filter).await.wrap_err_with(|| {
            format!(
                "Failed to get logs for {} ({}-{})",
                address, from_block, to_block
            )
        })
    }

    /// Position of a log within its chain, for emission-order sorting.
    fn log_position(log: &Log) -> (u64, u64) {
        (
            log.block_number.unwrap_or_default(),
            log.log_index.unwrap_or_default(),
        )
    }

    fn event(&self, log: &Log, payload: RelayPayload) -> RelayEvent {
        let (block_number, log_index) = Self::log_position(log);
        RelayEvent {
            source_chain_id: self.chain_id,
            block_number,
            log_index,
            payload,
        }
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .wrap_err("Failed to query chain id")
    }

    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .wrap_err("Failed to get block number")
    }

    async fn fetch_events(&self, from_block: u64, to_block: u64) -> Result<Vec<RelayEvent>> {
        let mut events = Vec::new();

        if let Some(address) = self.contracts.bridge_lock {
            for log in self.contract_logs(address, from_block, to_block).await? {
                let Some(topic0) = log.topics().first() else {
                    continue;
                };
                if *topic0 != BridgeLock::Locked::SIGNATURE_HASH {
                    continue;
                }
                match BridgeLock::Locked::decode_log(&log.inner, true) {
                    Ok(decoded) => events.push(self.event(
                        &log,
                        RelayPayload::Locked {
                            user: decoded.data.user,
                            amount: decoded.data.amount,
                            nonce: decoded.data.nonce,
                        },
                    )),
                    Err(e) => warn!(
                        tx_hash = ?log.transaction_hash,
                        error = %e,
                        "Skipping undecodable Locked log"
                    ),
                }
            }
        }

        if let Some(address) = self.contracts.bridge_mint {
            for log in self.contract_logs(address, from_block, to_block).await? {
                let Some(topic0) = log.topics().first() else {
                    continue;
                };
                if *topic0 != BridgeMint::Burned::SIGNATURE_HASH {
                    continue;
                }
                match BridgeMint::Burned::decode_log(&log.inner, true) {
                    Ok(decoded) => events.push(self.event(
                        &log,
                        RelayPayload::Burned {
                            user: decoded.data.user,
                            amount: decoded.data.amount,
                            nonce: decoded.data.nonce,
                        },
                    )),
                    Err(e) => warn!(
                        tx_hash = ?log.transaction_hash,
                        error = %e,
                        "Skipping undecodable Burned log"
                    ),
                }
            }
        }

        if let Some(address) = self.contracts.governance_voting {
            for log in self.contract_logs(address, from_block, to_block).await? {
                let Some(topic0) = log.topics().first() else {
                    continue;
                };
                if *topic0 != GovernanceVoting::ProposalPassed::SIGNATURE_HASH {
                    continue;
                }
                match GovernanceVoting::ProposalPassed::decode_log(&log.inner, true) {
                    Ok(decoded) => events.push(self.event(
                        &log,
                        RelayPayload::ProposalPassed {
                            proposal_id: decoded.data.proposalId,
                            data: decoded.data.data.to_vec(),
                        },
                    )),
                    Err(e) => warn!(
                        tx_hash = ?log.transaction_hash,
                        error = %e,
                        "Skipping undecodable ProposalPassed log"
                    ),
                }
            }
        }

        Ok(events)
    }

    async fn mint_wrapped(
        &self,
        user: Address,
        amount: U256,
        nonce: U256,
    ) -> Result<String, SubmitError> {
        let address = self.contracts.bridge_mint.ok_or_else(|| {
            SubmitError::Other(eyre!("chain {} has no mint contract deployed", self.chain_id))
        })?;

        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new().wallet(wallet).on_http(
            self.rpc_url
                .parse()
                .map_err(|e| SubmitError::Other(eyre!("Invalid RPC URL: {}", e)))?,
        );
        let contract = BridgeMint::new(address, &provider);

        debug!(user = %user, amount = %amount, nonce = %nonce, "Submitting mintWrapped");

        let pending = contract
            .mintWrapped(user, amount, nonce)
            .send()
            .await
            .map_err(|e| classify_submit_error(eyre!("Failed to send mintWrapped: {}", e)))?;

        let tx_hash = *pending.tx_hash();
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| SubmitError::Other(eyre!("Failed to get mintWrapped receipt: {}", e)))?;

        if !receipt.status() {
            return Err(SubmitError::Other(eyre!("mintWrapped transaction reverted")));
        }

        Ok(format!("0x{:x}", tx_hash))
    }

    async fn unlock(
        &self,
        user: Address,
        amount: U256,
        nonce: U256,
    ) -> Result<String, SubmitError> {
        let address = self.contracts.bridge_lock.ok_or_else(|| {
            SubmitError::Other(eyre!("chain {} has no lock contract deployed", self.chain_id))
        })?;

        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new().wallet(wallet).on_http(
            self.rpc_url
                .parse()
                .map_err(|e| SubmitError::Other(eyre!("Invalid RPC URL: {}", e)))?,
        );
        let contract = BridgeLock::new(address, &provider);

        debug!(user = %user, amount = %amount, nonce = %nonce, "Submitting unlock");

        let pending = contract
            .unlock(user, amount, nonce)
            .send()
            .await
            .map_err(|e| classify_submit_error(eyre!("Failed to send unlock: {}", e)))?;

        let tx_hash = *pending.tx_hash();
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| SubmitError::Other(eyre!("Failed to get unlock receipt: {}", e)))?;

        if !receipt.status() {
            return Err(SubmitError::Other(eyre!("unlock transaction reverted")));
        }

        Ok(format!("0x{:x}", tx_hash))
    }

    async fn pause_bridge(&self) -> Result<String, SubmitError> {
        let address = self.contracts.governance_emergency.ok_or_else(|| {
            SubmitError::Other(eyre!(
                "chain {} has no emergency contract deployed",
                self.chain_id
            ))
        })?;

        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new().wallet(wallet).on_http(
            self.rpc_url
                .parse()
                .map_err(|e| SubmitError::Other(eyre!("Invalid RPC URL: {}", e)))?,
        );
        let contract = GovernanceEmergency::new(address, &provider);

        debug!("Submitting pauseBridge");

        let pending = contract
            .pauseBridge()
            .send()
            .await
            .map_err(|e| classify_submit_error(eyre!("Failed to send pauseBridge: {}", e)))?;

        let tx_hash = *pending.tx_hash();
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| SubmitError::Other(eyre!("Failed to get pauseBridge receipt: {}", e)))?;

        if !receipt.status() {
            return Err(SubmitError::Other(eyre!("pauseBridge transaction reverted")));
        }

        Ok(format!("0x{:x}", tx_hash))
    }
}
