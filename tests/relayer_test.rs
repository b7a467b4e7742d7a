//! End-to-end relayer tests against fake chain clients.
//!
//! Run with: cargo test --test relayer_test
//!
//! No running chain is required: both chains are in-process fakes and the
//! ledger is an in-memory SQLite database.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use eyre::eyre;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use bridge_relayer::client::{classify_submit_error, ChainClient, SubmitError};
use bridge_relayer::db::{self, IDEMPOTENT_SETTLEMENT};
use bridge_relayer::dispatcher::Dispatcher;
use bridge_relayer::relayer::ChainPipeline;
use bridge_relayer::types::{RelayEvent, RelayPayload};

const CHAIN_A_ID: u64 = 31337;
const CHAIN_B_ID: u64 = 31338;

/// In-process chain double: a settable head, a log store that may hold
/// events in any order, and recorders for every fetch and submission.
struct FakeChain {
    chain_id: u64,
    head: AtomicU64,
    events: Mutex<Vec<RelayEvent>>,
    fetches: Mutex<Vec<(u64, u64)>>,
    submissions: Mutex<Vec<String>>,
    fail_fetch: AtomicBool,
    /// When set, every submission fails with this message.
    submit_failure: Mutex<Option<String>>,
}

impl FakeChain {
    fn new(chain_id: u64, head: u64) -> Self {
        Self {
            chain_id,
            head: AtomicU64::new(head),
            events: Mutex::new(Vec::new()),
            fetches: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            fail_fetch: AtomicBool::new(false),
            submit_failure: Mutex::new(None),
        }
    }

    fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    fn push_event(&self, block_number: u64, log_index: u64, payload: RelayPayload) {
        self.events.lock().unwrap().push(RelayEvent {
            source_chain_id: self.chain_id,
            block_number,
            log_index,
            payload,
        });
    }

    fn fail_submissions_with(&self, message: &str) {
        *self.submit_failure.lock().unwrap() = Some(message.to_string());
    }

    fn clear_submit_failure(&self) {
        *self.submit_failure.lock().unwrap() = None;
    }

    fn submissions(&self) -> Vec<String> {
        self.submissions.lock().unwrap().clone()
    }

    fn fetches(&self) -> Vec<(u64, u64)> {
        self.fetches.lock().unwrap().clone()
    }

    fn record_submission(&self, description: String) -> Result<String, SubmitError> {
        if let Some(message) = self.submit_failure.lock().unwrap().clone() {
            return Err(classify_submit_error(eyre!(message)));
        }
        let settlement = format!("0xtx-{}", self.submissions.lock().unwrap().len());
        self.submissions.lock().unwrap().push(description);
        Ok(settlement)
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn chain_id(&self) -> eyre::Result<u64> {
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> eyre::Result<u64> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn fetch_events(&self, from_block: u64, to_block: u64) -> eyre::Result<Vec<RelayEvent>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(eyre!("RPC timeout"));
        }
        self.fetches.lock().unwrap().push((from_block, to_block));
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.block_number >= from_block && e.block_number <= to_block)
            .cloned()
            .collect())
    }

    async fn mint_wrapped(
        &self,
        user: Address,
        amount: U256,
        nonce: U256,
    ) -> Result<String, SubmitError> {
        self.record_submission(format!("mint:{}:{}:{}", user, amount, nonce))
    }

    async fn unlock(
        &self,
        user: Address,
        amount: U256,
        nonce: U256,
    ) -> Result<String, SubmitError> {
        self.record_submission(format!("unlock:{}:{}:{}", user, amount, nonce))
    }

    async fn pause_bridge(&self) -> Result<String, SubmitError> {
        self.record_submission("pause".to_string())
    }
}

async fn memory_ledger() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

fn locked(nonce: u64) -> RelayPayload {
    RelayPayload::Locked {
        user: Address::repeat_byte(0x11),
        amount: U256::from(100u64),
        nonce: U256::from(nonce),
    }
}

fn locked_event(nonce: u64, block_number: u64, log_index: u64) -> RelayEvent {
    RelayEvent {
        source_chain_id: CHAIN_A_ID,
        block_number,
        log_index,
        payload: locked(nonce),
    }
}

#[tokio::test]
async fn test_duplicate_delivery_dispatches_exactly_once() {
    let pool = memory_ledger().await;
    let chain_b = Arc::new(FakeChain::new(CHAIN_B_ID, 0));
    let dispatcher = Dispatcher::new(pool.clone(), chain_b.clone());

    let event = locked_event(7, 10, 0);
    dispatcher.handle(&event).await.unwrap();
    dispatcher.handle(&event).await.unwrap();

    assert_eq!(chain_b.submissions().len(), 1);
    assert!(db::has_processed(&pool, CHAIN_A_ID as i64, "LOCK-7")
        .await
        .unwrap());
    assert_eq!(db::processed_count(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_burned_event_unlocks_on_destination() {
    let pool = memory_ledger().await;
    let chain_a = Arc::new(FakeChain::new(CHAIN_A_ID, 0));
    let dispatcher = Dispatcher::new(pool.clone(), chain_a.clone());

    let event = RelayEvent {
        source_chain_id: CHAIN_B_ID,
        block_number: 4,
        log_index: 0,
        payload: RelayPayload::Burned {
            user: Address::repeat_byte(0x22),
            amount: U256::from(55u64),
            nonce: U256::from(3u64),
        },
    };
    dispatcher.handle(&event).await.unwrap();

    let submissions = chain_a.submissions();
    assert_eq!(submissions.len(), 1);
    assert!(submissions[0].starts_with("unlock:"));
    assert!(db::has_processed(&pool, CHAIN_B_ID as i64, "BURN-3")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_proposal_passed_pauses_destination_regardless_of_payload() {
    let pool = memory_ledger().await;
    let chain_a = Arc::new(FakeChain::new(CHAIN_A_ID, 0));
    let dispatcher = Dispatcher::new(pool.clone(), chain_a.clone());

    let event = RelayEvent {
        source_chain_id: CHAIN_B_ID,
        block_number: 9,
        log_index: 1,
        payload: RelayPayload::ProposalPassed {
            proposal_id: U256::from(2u64),
            data: vec![0x01, 0x02, 0x03],
        },
    };
    dispatcher.handle(&event).await.unwrap();

    assert_eq!(chain_a.submissions(), vec!["pause".to_string()]);
    assert!(db::has_processed(&pool, CHAIN_B_ID as i64, "GOV-2")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_events_dispatched_in_emission_order() {
    let pool = memory_ledger().await;
    let chain_a = Arc::new(FakeChain::new(CHAIN_A_ID, 13));
    let chain_b = Arc::new(FakeChain::new(CHAIN_B_ID, 0));

    // Delivered out of order by the log store.
    chain_a.push_event(7, 1, locked(2));
    chain_a.push_event(5, 0, locked(0));
    chain_a.push_event(7, 0, locked(1));

    let mut pipeline = ChainPipeline::new(
        "chain-a",
        chain_a.clone(),
        Dispatcher::new(pool.clone(), chain_b.clone()),
        3,
        0,
    );
    pipeline.catch_up().await.unwrap();

    let submissions = chain_b.submissions();
    assert_eq!(submissions.len(), 3);
    assert!(submissions[0].ends_with(":0"));
    assert!(submissions[1].ends_with(":1"));
    assert!(submissions[2].ends_with(":2"));
}

#[tokio::test]
async fn test_scan_never_enters_the_unconfirmed_window() {
    let pool = memory_ledger().await;
    let chain_a = Arc::new(FakeChain::new(CHAIN_A_ID, 100));
    let chain_b = Arc::new(FakeChain::new(CHAIN_B_ID, 0));

    let mut pipeline = ChainPipeline::new(
        "chain-a",
        chain_a.clone(),
        Dispatcher::new(pool.clone(), chain_b),
        3,
        0,
    );
    pipeline.catch_up().await.unwrap();

    assert_eq!(chain_a.fetches(), vec![(0, 97)]);
    assert_eq!(pipeline.next_block(), 98);
}

#[tokio::test]
async fn test_short_chain_is_not_scanned_at_all() {
    let pool = memory_ledger().await;
    let chain_a = Arc::new(FakeChain::new(CHAIN_A_ID, 2));
    let chain_b = Arc::new(FakeChain::new(CHAIN_B_ID, 0));

    let mut pipeline = ChainPipeline::new(
        "chain-a",
        chain_a.clone(),
        Dispatcher::new(pool.clone(), chain_b),
        3,
        0,
    );
    pipeline.catch_up().await.unwrap();

    assert!(chain_a.fetches().is_empty());
    assert_eq!(pipeline.next_block(), 0);
}

#[tokio::test]
async fn test_recovery_drains_backlog_exactly_once() {
    let pool = memory_ledger().await;
    let chain_a = Arc::new(FakeChain::new(CHAIN_A_ID, 53));
    let chain_b = Arc::new(FakeChain::new(CHAIN_B_ID, 0));

    // Events accumulated in blocks 1..=50 while the relayer was down.
    for nonce in 0..50u64 {
        chain_a.push_event(nonce + 1, 0, locked(nonce));
    }

    let mut pipeline = ChainPipeline::new(
        "chain-a",
        chain_a.clone(),
        Dispatcher::new(pool.clone(), chain_b.clone()),
        3,
        0,
    );
    pipeline.recover().await;

    assert_eq!(chain_b.submissions().len(), 50);
    assert_eq!(db::processed_count(&pool).await.unwrap(), 50);
    assert_eq!(pipeline.next_block(), 51);

    // A live tick over the same head finds nothing new.
    pipeline.catch_up().await.unwrap();
    assert_eq!(chain_b.submissions().len(), 50);
}

#[tokio::test]
async fn test_restart_rescan_does_not_double_spend() {
    let pool = memory_ledger().await;
    let chain_a = Arc::new(FakeChain::new(CHAIN_A_ID, 20));
    let chain_b = Arc::new(FakeChain::new(CHAIN_B_ID, 0));
    chain_a.push_event(5, 0, locked(0));
    chain_a.push_event(9, 0, locked(1));

    let mut first = ChainPipeline::new(
        "chain-a",
        chain_a.clone(),
        Dispatcher::new(pool.clone(), chain_b.clone()),
        3,
        0,
    );
    first.recover().await;
    assert_eq!(chain_b.submissions().len(), 2);

    // Simulated restart: a fresh pipeline rescans from genesis against the
    // same ledger.
    let mut second = ChainPipeline::new(
        "chain-a",
        chain_a.clone(),
        Dispatcher::new(pool.clone(), chain_b.clone()),
        3,
        0,
    );
    second.recover().await;
    assert_eq!(chain_b.submissions().len(), 2);
}

#[tokio::test]
async fn test_remote_replay_guard_recorded_with_sentinel() {
    let pool = memory_ledger().await;
    let chain_b = Arc::new(FakeChain::new(CHAIN_B_ID, 0));
    chain_b.fail_submissions_with("execution reverted: Nonce already processed");

    let dispatcher = Dispatcher::new(pool.clone(), chain_b.clone());
    let event = locked_event(4, 8, 0);
    dispatcher.handle(&event).await.unwrap();

    let row = db::get_processed(&pool, CHAIN_A_ID as i64, "LOCK-4")
        .await
        .unwrap()
        .expect("event should be recorded");
    assert_eq!(row.settlement_ref, IDEMPOTENT_SETTLEMENT);

    // Not retried once recorded.
    chain_b.clear_submit_failure();
    dispatcher.handle(&event).await.unwrap();
    assert!(chain_b.submissions().is_empty());
}

#[tokio::test]
async fn test_other_submission_failure_leaves_event_for_retry() {
    let pool = memory_ledger().await;
    let chain_b = Arc::new(FakeChain::new(CHAIN_B_ID, 0));
    chain_b.fail_submissions_with("insufficient funds for gas");

    let dispatcher = Dispatcher::new(pool.clone(), chain_b.clone());
    let event = locked_event(6, 12, 0);
    dispatcher.handle(&event).await.unwrap();

    assert!(!db::has_processed(&pool, CHAIN_A_ID as i64, "LOCK-6")
        .await
        .unwrap());

    // The next overlapping scan succeeds and records the event.
    chain_b.clear_submit_failure();
    dispatcher.handle(&event).await.unwrap();
    assert_eq!(chain_b.submissions().len(), 1);
    assert!(db::has_processed(&pool, CHAIN_A_ID as i64, "LOCK-6")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_scan_failure_leaves_cursor_unadvanced() {
    let pool = memory_ledger().await;
    let chain_a = Arc::new(FakeChain::new(CHAIN_A_ID, 30));
    let chain_b = Arc::new(FakeChain::new(CHAIN_B_ID, 0));
    chain_a.push_event(10, 0, locked(0));

    let mut pipeline = ChainPipeline::new(
        "chain-a",
        chain_a.clone(),
        Dispatcher::new(pool.clone(), chain_b.clone()),
        3,
        0,
    );

    chain_a.fail_fetch.store(true, Ordering::SeqCst);
    assert!(pipeline.catch_up().await.is_err());
    assert_eq!(pipeline.next_block(), 0);
    assert!(chain_b.submissions().is_empty());

    // The next tick re-derives the same range and succeeds.
    chain_a.fail_fetch.store(false, Ordering::SeqCst);
    pipeline.catch_up().await.unwrap();
    assert_eq!(pipeline.next_block(), 28);
    assert_eq!(chain_b.submissions().len(), 1);
}

#[tokio::test]
async fn test_lock_relay_end_to_end() {
    let pool = memory_ledger().await;
    let chain_a = Arc::new(FakeChain::new(CHAIN_A_ID, 42));
    let chain_b = Arc::new(FakeChain::new(CHAIN_B_ID, 0));

    let user = Address::repeat_byte(0xAA);
    chain_a.push_event(
        40,
        0,
        RelayPayload::Locked {
            user,
            amount: U256::from(10u64),
            nonce: U256::from(7u64),
        },
    );

    let mut pipeline = ChainPipeline::new(
        "chain-a",
        chain_a.clone(),
        Dispatcher::new(pool.clone(), chain_b.clone()),
        3,
        0,
    );

    // Head 42, depth 3: block 40 is still inside the unconfirmed window.
    pipeline.catch_up().await.unwrap();
    assert!(chain_b.submissions().is_empty());

    // One more block confirms it.
    chain_a.set_head(43);
    pipeline.catch_up().await.unwrap();

    let submissions = chain_b.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0], format!("mint:{}:10:7", user));

    let row = db::get_processed(&pool, CHAIN_A_ID as i64, "LOCK-7")
        .await
        .unwrap()
        .expect("ledger row should exist");
    assert!(row.settlement_ref.starts_with("0xtx-"));
}
