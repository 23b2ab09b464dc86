#![forbid(unsafe_code)]

use rl_core::ids::{ChainConfigId, ChainId, ClientName};
use rl_core::model::ExecutionStatus;
use rl_storage::{CancelToken, RunStatusAppendRequest, SqliteStore, StoreError, StoreErrorKind};
use rusqlite::{Connection, params};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("rl_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn started(client_name: &ClientName) -> RunStatusAppendRequest {
    RunStatusAppendRequest {
        client_name: client_name.clone(),
        chain_id: Some(ChainId::new(1)),
        chain_config_id: ChainConfigId::new(42),
        status: ExecutionStatus::Started,
        start_status: None,
        started_at_ms: 1,
        current_execution_element: None,
    }
}

fn ledger_len(store: &SqliteStore) -> i64 {
    let conn = Connection::open(store.db_path()).expect("open db");
    conn.query_row("SELECT COUNT(*) FROM run_status", [], |row| row.get(0))
        .expect("count rows")
}

#[test]
fn uncommitted_transaction_is_not_persisted_after_reopen() {
    let storage_dir = temp_dir("uncommitted_transaction");
    let host = ClientName::try_new("host-a").expect("client");

    {
        let _store = SqliteStore::open(&storage_dir).expect("open store");
    }

    let db_path = storage_dir.join("runledger.db");
    {
        let mut conn = Connection::open(&db_path).expect("open db");
        let tx = conn.transaction().expect("begin tx");
        tx.execute(
            "INSERT INTO run_status(chain_id, chain_config_id, client_name, execution_status, \
             start_status, started_at_ms, last_status_update_ms) \
             VALUES (?1, ?2, ?3, 'STARTED', 1, 0, 0)",
            params![1i64, 42i64, host.as_str()],
        )
        .expect("insert run status");
        // Dropped without commit: the scheduler died mid-write.
    }

    let store = SqliteStore::open(&storage_dir).expect("open store again");
    let orphans = store
        .orphaned_groups(&CancelToken::new(), &host)
        .expect("orphans");
    assert!(orphans.is_empty(), "uncommitted record should not persist");
}

#[test]
fn ledger_rejects_update_and_delete() {
    let store = SqliteStore::open(temp_dir("append_only")).expect("open store");
    let host = ClientName::try_new("host-a").expect("client");
    store
        .run_status_append(&CancelToken::new(), started(&host))
        .expect("append");

    let conn = Connection::open(store.db_path()).expect("open db");
    let update = conn.execute("UPDATE run_status SET execution_status='DEAD'", []);
    assert!(update.is_err(), "ledger rows must not be updated");
    let delete = conn.execute("DELETE FROM run_status", []);
    assert!(delete.is_err(), "ledger rows must not be deleted");
    assert_eq!(ledger_len(&store), 1);
}

#[test]
fn cancelled_operations_leave_the_ledger_untouched() {
    let store = SqliteStore::open(temp_dir("cancelled")).expect("open store");
    let host = ClientName::try_new("host-a").expect("client");

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = store
        .run_status_append(&cancel, started(&host))
        .expect_err("cancelled append");
    assert!(matches!(err, StoreError::Cancelled));
    assert_eq!(err.kind(), StoreErrorKind::Cancelled);

    let expired = CancelToken::with_timeout(Duration::ZERO);
    assert!(matches!(
        store.orphaned_groups(&expired, &host),
        Err(StoreError::Cancelled)
    ));

    assert_eq!(ledger_len(&store), 0);
}

#[test]
fn blocked_writer_gives_up_at_the_caller_deadline() {
    let store = SqliteStore::open_with(
        temp_dir("blocked_writer"),
        rl_storage::StoreOptions {
            busy_timeout: Duration::from_secs(30),
        },
    )
    .expect("open store");
    let host = ClientName::try_new("host-a").expect("client");

    let mut blocker = Connection::open(store.db_path()).expect("open db");
    let tx = blocker
        .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
        .expect("hold write lock");

    let started_at = Instant::now();
    let cancel = CancelToken::with_timeout(Duration::from_millis(200));
    let err = store
        .run_status_append(&cancel, started(&host))
        .expect_err("write lock is held");
    assert!(started_at.elapsed() < Duration::from_secs(2));
    assert!(matches!(err, StoreError::Cancelled), "{err:?}");

    drop(tx);
    assert_eq!(ledger_len(&store), 0);
}

#[test]
fn cancel_interrupts_a_wait_on_another_writers_lock() {
    let store = SqliteStore::open_with(
        temp_dir("cancel_lock_wait"),
        rl_storage::StoreOptions {
            busy_timeout: Duration::from_secs(4),
        },
    )
    .expect("open store");
    let host = ClientName::try_new("host-a").expect("client");

    let mut blocker = Connection::open(store.db_path()).expect("open db");
    let tx = blocker
        .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
        .expect("hold write lock");

    let cancel = CancelToken::new();
    let canceller = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            cancel.cancel();
        })
    };

    let started_at = Instant::now();
    let err = store
        .run_status_append(&cancel, started(&host))
        .expect_err("write lock is held");
    let elapsed = started_at.elapsed();
    canceller.join().expect("canceller");

    assert!(matches!(err, StoreError::Cancelled), "{err:?}");
    assert!(elapsed < Duration::from_millis(500), "returned after {elapsed:?}");

    drop(tx);
    assert_eq!(ledger_len(&store), 0);
    assert!(
        store
            .run_status_append(&CancelToken::new(), started(&host))
            .is_ok()
    );
}

#[test]
fn deadline_holds_while_another_call_owns_the_connection() {
    let store = Arc::new(
        SqliteStore::open_with(
            temp_dir("conn_mutex_wait"),
            rl_storage::StoreOptions {
                busy_timeout: Duration::from_secs(4),
            },
        )
        .expect("open store"),
    );
    let host = ClientName::try_new("host-a").expect("client");

    let mut blocker = Connection::open(store.db_path()).expect("open db");
    let tx = blocker
        .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
        .expect("hold write lock");

    // This writer sits in its lock wait holding the store's connection.
    let writer = {
        let store = Arc::clone(&store);
        let host = host.clone();
        thread::spawn(move || store.run_status_append(&CancelToken::new(), started(&host)))
    };
    thread::sleep(Duration::from_millis(100));

    let started_at = Instant::now();
    let err = store
        .ping(&CancelToken::with_timeout(Duration::from_millis(200)))
        .expect_err("connection is busy");
    let elapsed = started_at.elapsed();
    assert!(matches!(err, StoreError::Cancelled), "{err:?}");
    assert!(elapsed < Duration::from_millis(500), "returned after {elapsed:?}");

    drop(tx);
    let appended = writer.join().expect("writer thread");
    assert!(appended.is_ok(), "{appended:?}");
    assert_eq!(ledger_len(&store), 1);
}
