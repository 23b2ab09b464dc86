#![forbid(unsafe_code)]

mod cancel;
mod chain_config;
mod error;
mod lock_wait;
mod run_status;
mod support;
mod types;

pub use cancel::CancelToken;
pub use error::{StoreError, StoreErrorKind};
pub use types::*;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use lock_wait::{LockWaitScope, wait_for_lock};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Duration;
use support::{SCHEMA_VERSION, install_schema, now_ms, preflight_gate};

const DB_FILE_NAME: &str = "runledger.db";
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
// SQLite VM steps between cancellation polls while a statement runs.
const CANCEL_POLL_OPS: i32 = 1_000;
// Sleep between attempts at the connection mutex while another call holds it.
const CONN_POLL_INTERVAL: Duration = Duration::from_millis(2);

#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// Upper bound on waiting for another writer's lock. Capped per call by the caller's
    /// cancellation deadline.
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// Shared run-status ledger on a SQLite file.
///
/// Several scheduler processes may open the same file; every read goes to the database,
/// nothing is cached in process. The connection sits behind a mutex so one handle can be
/// shared across threads, and `finalize` closes it for good.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
    storage_dir: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with(storage_dir, StoreOptions::default())
    }

    pub fn open_with(
        storage_dir: impl AsRef<Path>,
        options: StoreOptions,
    ) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;\n\
             PRAGMA synchronous=NORMAL;\n\
             PRAGMA foreign_keys=ON;",
        )?;

        preflight_gate(&conn)?;
        install_schema(&conn)?;
        // From here on lock waits are bounded per call by the caller's token.
        conn.busy_handler(Some(wait_for_lock))?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            storage_dir,
            busy_timeout: options.busy_timeout,
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(DB_FILE_NAME)
    }

    pub fn schema_version(&self) -> i64 {
        SCHEMA_VERSION
    }

    /// Trivial round-trip. Fails with `Unreachable` once the store has been finalized.
    pub fn ping(&self, cancel: &CancelToken) -> Result<(), StoreError> {
        self.with_conn(cancel, |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }

    pub fn is_open(&self) -> bool {
        self.conn.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Closes the connection. Idempotent; returns whether this call did the closing.
    pub fn finalize(&self) -> Result<bool, StoreError> {
        let mut guard = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let Some(conn) = guard.take() else {
            return Ok(false);
        };
        conn.close().map_err(|(_, err)| StoreError::Sql(err))?;
        Ok(true)
    }

    fn with_conn<T>(
        &self,
        cancel: &CancelToken,
        op: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        cancel.check()?;
        let guard = self.lock_conn(cancel)?;
        let conn = guard.as_ref().ok_or(StoreError::Unreachable)?;
        // Waiting for the mutex may have used up the caller's budget.
        cancel.check()?;

        let scope = LockWaitScope::enter(cancel, cancel.cap(self.busy_timeout));
        let watcher = cancel.clone();
        conn.progress_handler(CANCEL_POLL_OPS, Some(move || watcher.is_cancelled()));

        let result = op(conn);

        conn.progress_handler(0, None::<fn() -> bool>);
        drop(scope);
        result.map_err(|err| StoreError::from_aborted(err, cancel.is_cancelled()))
    }

    /// Takes the connection mutex, giving up as soon as `cancel` fires.
    fn lock_conn(
        &self,
        cancel: &CancelToken,
    ) -> Result<MutexGuard<'_, Option<Connection>>, StoreError> {
        loop {
            match self.conn.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(_)) => return Err(StoreError::LockPoisoned),
                Err(TryLockError::WouldBlock) => {
                    cancel.check()?;
                    std::thread::sleep(CONN_POLL_INTERVAL);
                }
            }
        }
    }
}

fn to_sqlite_i64(value: u32) -> i64 {
    i64::from(value)
}

fn from_sqlite_u32(index: usize, value: i64) -> Result<u32, rusqlite::Error> {
    u32::try_from(value).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Integer, Box::new(err))
    })
}
