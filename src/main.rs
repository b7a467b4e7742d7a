use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use eyre::{Result, WrapErr};
use tokio::sync::watch;

use bridge_relayer::client::{ChainClient, ChainContracts, EvmChainClient};
use bridge_relayer::config::{Config, Deployments};
use bridge_relayer::db;
use bridge_relayer::dispatcher::Dispatcher;
use bridge_relayer::readiness::{self, ReadinessConfig};
use bridge_relayer::relayer::{ChainPipeline, Relayer};

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    // Run the async main
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    init_logging();

    tracing::info!("Starting bridge relayer");

    let config = Config::load()?;
    let deployments = Deployments::load(&config.deployments_dir)?;
    tracing::info!(
        chain_a_id = deployments.chain_a.chain_id,
        chain_b_id = deployments.chain_b.chain_id,
        confirmation_depth = config.relayer.confirmation_depth,
        "Configuration loaded"
    );

    // Shutdown fanout: the signal task flips the watch value once.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // The relayer restarts itself after a backoff instead of exiting; a
    // supervising process manager handles true termination.
    let restart_backoff = Duration::from_millis(config.relayer.restart_backoff_ms);
    loop {
        match run_relayer(&config, &deployments, shutdown_rx.clone()).await {
            Ok(()) => break,
            Err(e) => {
                if *shutdown_rx.borrow() {
                    break;
                }
                tracing::error!(
                    error = %e,
                    backoff_ms = restart_backoff.as_millis() as u64,
                    "Relayer failed, restarting after backoff"
                );
                tokio::time::sleep(restart_backoff).await;
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("Bridge relayer stopped");
    Ok(())
}

/// One relayer lifetime: ledger, clients, readiness, recovery, live tails.
async fn run_relayer(
    config: &Config,
    deployments: &Deployments,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let pool = db::create_pool(&config.database.path).await?;
    db::run_migrations(&pool).await?;
    tracing::info!(path = %config.database.path, "Ledger database ready");

    let chain_a: Arc<dyn ChainClient> = Arc::new(EvmChainClient::new(
        &config.chain_a.rpc_url,
        &config.relayer.private_key,
        deployments.chain_a.chain_id,
        ChainContracts {
            bridge_lock: Some(parse_address(&deployments.chain_a.bridge_lock, "BridgeLock")?),
            governance_emergency: Some(parse_address(
                &deployments.chain_a.governance_emergency,
                "GovernanceEmergency",
            )?),
            ..Default::default()
        },
    )?);

    let chain_b: Arc<dyn ChainClient> = Arc::new(EvmChainClient::new(
        &config.chain_b.rpc_url,
        &config.relayer.private_key,
        deployments.chain_b.chain_id,
        ChainContracts {
            bridge_mint: Some(parse_address(&deployments.chain_b.bridge_mint, "BridgeMint")?),
            governance_voting: Some(parse_address(
                &deployments.chain_b.governance_voting,
                "GovernanceVoting",
            )?),
            ..Default::default()
        },
    )?);

    readiness::wait_for_chains(
        chain_a.as_ref(),
        chain_b.as_ref(),
        &ReadinessConfig {
            max_attempts: config.relayer.startup_retry_attempts,
            retry_delay: Duration::from_millis(config.relayer.startup_retry_delay_ms),
        },
    )
    .await?;

    let pipeline_a = ChainPipeline::new(
        "chain-a",
        chain_a.clone(),
        Dispatcher::new(pool.clone(), chain_b.clone()),
        config.relayer.confirmation_depth,
        config.chain_a.start_block,
    );
    let pipeline_b = ChainPipeline::new(
        "chain-b",
        chain_b,
        Dispatcher::new(pool.clone(), chain_a),
        config.relayer.confirmation_depth,
        config.chain_b.start_block,
    );

    let relayer = Relayer {
        chain_a: pipeline_a,
        chain_b: pipeline_b,
    };

    let result = relayer
        .run(
            Duration::from_millis(config.relayer.poll_interval_ms),
            shutdown,
        )
        .await;

    // Close the ledger handle before exiting; in-flight handlers have
    // already returned by this point.
    pool.close().await;

    result
}

fn parse_address(raw: &str, what: &str) -> Result<Address> {
    Address::from_str(raw).wrap_err_with(|| format!("Invalid {} address: {}", what, raw))
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridge_relayer=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
