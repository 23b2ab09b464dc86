#![forbid(unsafe_code)]

use crate::backend::RunStatusStore;
use crate::context::{ChainElementExecution, TrackerContext};
use rl_core::clock::now_ms;
use rl_core::ids::{ChainConfigId, ChainId, RunStatusId};
use rl_core::model::ExecutionStatus;
use rl_storage::RunStatusAppendRequest;

impl<S: RunStatusStore> TrackerContext<S> {
    /// Records the start of a run and returns its id, which is also the run's group key.
    ///
    /// Returns `RunStatusId::INVALID` when nothing was recorded; the failure is logged and the
    /// caller decides whether to go ahead untracked.
    pub fn start_run(&self, chain_id: ChainId, chain_config_id: ChainConfigId) -> RunStatusId {
        if !chain_id.is_valid() || !chain_config_id.is_valid() {
            tracing::error!(
                chain_id = %chain_id,
                chain_config_id = %chain_config_id,
                "cannot save chain run status: invalid chain identifiers"
            );
            return RunStatusId::INVALID;
        }

        let request = RunStatusAppendRequest {
            client_name: self.client_name().clone(),
            chain_id: Some(chain_id),
            chain_config_id,
            status: ExecutionStatus::Started,
            start_status: None,
            started_at_ms: now_ms(),
            current_execution_element: None,
        };
        match self.store().append(&self.operation_token(), request) {
            Ok(run_status_id) => {
                tracing::debug!(
                    chain_id = %chain_id,
                    chain_config_id = %chain_config_id,
                    run_status_id = %run_status_id,
                    client_name = %self.client_name(),
                    "chain run started"
                );
                run_status_id
            }
            Err(err) => {
                tracing::error!(
                    chain_id = %chain_id,
                    chain_config_id = %chain_config_id,
                    client_name = %self.client_name(),
                    error = %err,
                    "cannot save information about the chain run status"
                );
                RunStatusId::INVALID
            }
        }
    }

    /// Closes the run opened by `start_run` with a terminal `status`.
    ///
    /// Returns whether the record was appended. Non-terminal statuses, the invalid id and
    /// already-closed runs are refused and logged.
    pub fn update_run(
        &self,
        element: &ChainElementExecution,
        run_status_id: RunStatusId,
        status: ExecutionStatus,
    ) -> bool {
        if !ExecutionStatus::Started.can_transition_to(status) {
            tracing::error!(
                run_status_id = %run_status_id,
                status = %status,
                "update chain status failed: status is not terminal"
            );
            return false;
        }
        if !run_status_id.is_valid() {
            tracing::error!(
                chain_id = %element.chain_id,
                status = %status,
                "update chain status failed: run was never recorded"
            );
            return false;
        }

        let request = RunStatusAppendRequest {
            client_name: self.client_name().clone(),
            chain_id: Some(element.chain_id),
            chain_config_id: element.chain_config_id,
            status,
            start_status: Some(run_status_id.as_start_status()),
            started_at_ms: now_ms(),
            current_execution_element: element.task_id,
        };
        match self.store().append(&self.operation_token(), request) {
            Ok(id) => {
                tracing::debug!(
                    chain_id = %element.chain_id,
                    start_status = %run_status_id,
                    run_status_id = %id,
                    status = %status,
                    "chain run status updated"
                );
                true
            }
            Err(err) => {
                tracing::error!(
                    chain_id = %element.chain_id,
                    start_status = %run_status_id,
                    status = %status,
                    client_name = %self.client_name(),
                    error = %err,
                    "update chain status failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::fake::FakeStore;
    use crate::context::{ChainElementExecution, TrackerContext};
    use rl_core::ids::{ChainConfigId, ChainId, ClientName, RunStatusId, TaskId};
    use rl_core::model::ExecutionStatus;
    use std::sync::Arc;

    fn context() -> TrackerContext<FakeStore> {
        TrackerContext::new(
            Arc::new(FakeStore::default()),
            ClientName::try_new("host-a").expect("client"),
        )
    }

    fn element() -> ChainElementExecution {
        ChainElementExecution {
            chain_id: ChainId::new(3),
            chain_config_id: ChainConfigId::new(42),
            task_id: Some(TaskId::new(11)),
        }
    }

    #[test]
    fn start_then_update_links_the_group() {
        let ctx = context();
        let run = ctx.start_run(ChainId::new(3), ChainConfigId::new(42));
        assert!(run.is_valid());
        assert!(ctx.update_run(&element(), run, ExecutionStatus::ChainFailed));

        let records = ctx.store().records.lock().expect("fake lock");
        assert_eq!(records.len(), 2);
        let (_, opened) = &records[0];
        let (_, closed) = &records[1];
        assert_eq!(opened.status, ExecutionStatus::Started);
        assert_eq!(closed.start_status, Some(run.as_start_status()));
        assert_eq!(closed.chain_id, opened.chain_id);
        assert_eq!(closed.current_execution_element, Some(TaskId::new(11)));
        assert!(opened.started_at_ms <= closed.started_at_ms);
    }

    #[test]
    fn start_failure_yields_the_sentinel() {
        let ctx = context();
        ctx.store().set_fail_appends(true);
        assert_eq!(
            ctx.start_run(ChainId::new(3), ChainConfigId::new(42)),
            RunStatusId::INVALID
        );
        assert_eq!(
            context().start_run(ChainId::new(0), ChainConfigId::new(42)),
            RunStatusId::INVALID
        );
    }

    #[test]
    fn update_refuses_non_terminal_sentinel_and_repeat() {
        let ctx = context();
        let run = ctx.start_run(ChainId::new(3), ChainConfigId::new(42));

        assert!(!ctx.update_run(&element(), run, ExecutionStatus::Started));
        assert!(!ctx.update_run(&element(), RunStatusId::INVALID, ExecutionStatus::ChainDone));
        assert!(ctx.update_run(&element(), run, ExecutionStatus::ChainDone));
        assert!(!ctx.update_run(&element(), run, ExecutionStatus::ChainDone));
        assert_eq!(ctx.store().records.lock().expect("fake lock").len(), 2);
    }
}
