#![forbid(unsafe_code)]

use rl_core::ids::{ChainConfigId, ChainId, ClientName, RunStatusId, StartStatus, TaskId};
use rl_core::model::ExecutionStatus;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunStatusRow {
    pub run_status_id: RunStatusId,
    pub chain_id: Option<ChainId>,
    pub chain_config_id: ChainConfigId,
    pub client_name: String,
    pub execution_status: ExecutionStatus,
    pub start_status: StartStatus,
    pub started_at_ms: i64,
    pub last_status_update_ms: i64,
    pub current_execution_element: Option<TaskId>,
}

/// One ledger record to append.
///
/// `start_status` must be `None` for `Started` (the store opens a new group keyed by the
/// generated id) and `Some` for every terminal status.
#[derive(Clone, Debug)]
pub struct RunStatusAppendRequest {
    pub client_name: ClientName,
    pub chain_id: Option<ChainId>,
    pub chain_config_id: ChainConfigId,
    pub status: ExecutionStatus,
    pub start_status: Option<StartStatus>,
    pub started_at_ms: i64,
    pub current_execution_element: Option<TaskId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunningRunRow {
    pub start_status: StartStatus,
    pub client_name: String,
    pub chain_id: Option<ChainId>,
    pub chain_config_id: ChainConfigId,
    pub started_at_ms: i64,
}
