//! Relayer configuration.
//!
//! Environment-style configuration in two parts: process settings from the
//! environment (with an optional .env file), and per-chain deployment
//! records produced by the deployment step, read as JSON and treated as
//! read-only input.

use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// Main configuration for the relayer
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub chain_a: ChainConfig,
    pub chain_b: ChainConfig,
    pub relayer: RelayerConfig,
    /// Directory holding the deployment record files.
    pub deployments_dir: PathBuf,
}

/// Ledger database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Per-chain endpoint configuration
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    /// First block recovery scans from (the deployment block).
    pub start_block: u64,
}

/// Relayer tuning
#[derive(Clone)]
pub struct RelayerConfig {
    pub private_key: String,
    pub confirmation_depth: u64,
    pub poll_interval_ms: u64,
    pub startup_retry_attempts: u32,
    pub startup_retry_delay_ms: u64,
    pub restart_backoff_ms: u64,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for RelayerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayerConfig")
            .field("private_key", &"<redacted>")
            .field("confirmation_depth", &self.confirmation_depth)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("startup_retry_attempts", &self.startup_retry_attempts)
            .field("startup_retry_delay_ms", &self.startup_retry_delay_ms)
            .field("restart_backoff_ms", &self.restart_backoff_ms)
            .finish()
    }
}

/// Default functions
fn default_confirmation_depth() -> u64 {
    3
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_startup_retry_attempts() -> u32 {
    30
}

fn default_startup_retry_delay() -> u64 {
    1000
}

fn default_restart_backoff() -> u64 {
    5000
}

fn default_db_path() -> String {
    "./data/processed_events.db".to_string()
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    fn load_from_env() -> Result<Self> {
        let database = DatabaseConfig {
            path: env::var("DB_PATH").unwrap_or_else(|_| default_db_path()),
        };

        let chain_a = ChainConfig {
            rpc_url: env::var("CHAIN_A_RPC_URL")
                .map_err(|_| eyre!("CHAIN_A_RPC_URL environment variable is required"))?,
            start_block: env::var("CHAIN_A_START_BLOCK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        };

        let chain_b = ChainConfig {
            rpc_url: env::var("CHAIN_B_RPC_URL")
                .map_err(|_| eyre!("CHAIN_B_RPC_URL environment variable is required"))?,
            start_block: env::var("CHAIN_B_START_BLOCK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        };

        let relayer = RelayerConfig {
            private_key: env::var("DEPLOYER_PRIVATE_KEY")
                .map_err(|_| eyre!("DEPLOYER_PRIVATE_KEY environment variable is required"))?,
            confirmation_depth: env::var("CONFIRMATION_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_confirmation_depth()),
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_poll_interval()),
            startup_retry_attempts: env::var("STARTUP_RETRY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_startup_retry_attempts()),
            startup_retry_delay_ms: env::var("STARTUP_RETRY_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_startup_retry_delay()),
            restart_backoff_ms: env::var("RESTART_BACKOFF_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_restart_backoff()),
        };

        let deployments_dir =
            PathBuf::from(env::var("DEPLOYMENTS_DIR").unwrap_or_else(|_| ".".to_string()));

        let config = Config {
            database,
            chain_a,
            chain_b,
            relayer,
            deployments_dir,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.path.is_empty() {
            return Err(eyre!("database.path cannot be empty"));
        }

        if self.chain_a.rpc_url.is_empty() {
            return Err(eyre!("chain_a.rpc_url cannot be empty"));
        }

        if self.chain_b.rpc_url.is_empty() {
            return Err(eyre!("chain_b.rpc_url cannot be empty"));
        }

        if self.relayer.private_key.len() != 66 || !self.relayer.private_key.starts_with("0x") {
            return Err(eyre!(
                "relayer.private_key must be 66 chars (0x + 64 hex chars)"
            ));
        }

        if self.relayer.poll_interval_ms == 0 {
            return Err(eyre!("relayer.poll_interval_ms must be positive"));
        }

        if self.relayer.startup_retry_attempts == 0 {
            return Err(eyre!("relayer.startup_retry_attempts must be positive"));
        }

        Ok(())
    }
}

/// Deployment record for chain A (lock side).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChainADeployments {
    pub bridge_lock: String,
    pub governance_emergency: String,
    pub chain_id: u64,
}

/// Deployment record for chain B (mint side).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChainBDeployments {
    pub bridge_mint: String,
    pub governance_voting: String,
    pub chain_id: u64,
}

/// Both chains' deployment records.
#[derive(Debug, Clone)]
pub struct Deployments {
    pub chain_a: ChainADeployments,
    pub chain_b: ChainBDeployments,
}

impl Deployments {
    /// Load the deployment record files from a directory.
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            chain_a: read_json(&dir.join("deployments_chain_a.json"))?,
            chain_b: read_json(&dir.join("deployments_chain_b.json"))?,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read deployment file {}", path.display()))?;
    serde_json::from_str(&raw)
        .wrap_err_with(|| format!("Failed to parse deployment file {}", path.display()))
}
