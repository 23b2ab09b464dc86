#![forbid(unsafe_code)]

use rl_core::ids::{ChainConfigId, ClientName, RunStatusId, StartStatus};
use rl_core::model::Lookup;
use rl_storage::{CancelToken, ChainConfigRow, RunStatusAppendRequest, SqliteStore, StoreError};

/// Persistence seam the tracker components run against.
///
/// Implementations must not cache: every read reflects the latest state committed by any
/// writer, and every write is a single atomic statement.
pub trait RunStatusStore: Send + Sync {
    /// Runs of `chain_config_id` started and not yet terminal. `NotFound` when none.
    fn count_running(
        &self,
        cancel: &CancelToken,
        chain_config_id: ChainConfigId,
    ) -> Lookup<u64, StoreError>;

    /// Groups of `client_name` with fewer than two records.
    fn orphaned_groups(
        &self,
        cancel: &CancelToken,
        client_name: &ClientName,
    ) -> Result<Vec<StartStatus>, StoreError>;

    fn append(
        &self,
        cancel: &CancelToken,
        record: RunStatusAppendRequest,
    ) -> Result<RunStatusId, StoreError>;

    fn chain_config(
        &self,
        cancel: &CancelToken,
        chain_config_id: ChainConfigId,
    ) -> Lookup<ChainConfigRow, StoreError>;

    /// Number of configuration rows removed.
    fn delete_chain_config(
        &self,
        cancel: &CancelToken,
        chain_config_id: ChainConfigId,
    ) -> Result<usize, StoreError>;

    fn ping(&self, cancel: &CancelToken) -> Result<(), StoreError>;

    /// Closes the connection; idempotent. `Ok(true)` only for the call that closed it.
    fn finalize(&self) -> Result<bool, StoreError>;
}

impl RunStatusStore for SqliteStore {
    fn count_running(
        &self,
        cancel: &CancelToken,
        chain_config_id: ChainConfigId,
    ) -> Lookup<u64, StoreError> {
        self.running_count(cancel, chain_config_id)
    }

    fn orphaned_groups(
        &self,
        cancel: &CancelToken,
        client_name: &ClientName,
    ) -> Result<Vec<StartStatus>, StoreError> {
        SqliteStore::orphaned_groups(self, cancel, client_name)
    }

    fn append(
        &self,
        cancel: &CancelToken,
        record: RunStatusAppendRequest,
    ) -> Result<RunStatusId, StoreError> {
        self.run_status_append(cancel, record)
    }

    fn chain_config(
        &self,
        cancel: &CancelToken,
        chain_config_id: ChainConfigId,
    ) -> Lookup<ChainConfigRow, StoreError> {
        self.chain_config_get(cancel, chain_config_id)
    }

    fn delete_chain_config(
        &self,
        cancel: &CancelToken,
        chain_config_id: ChainConfigId,
    ) -> Result<usize, StoreError> {
        self.chain_config_delete(cancel, chain_config_id)
    }

    fn ping(&self, cancel: &CancelToken) -> Result<(), StoreError> {
        SqliteStore::ping(self, cancel)
    }

    fn finalize(&self) -> Result<bool, StoreError> {
        SqliteStore::finalize(self)
    }
}
