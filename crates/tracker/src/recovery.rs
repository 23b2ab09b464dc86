#![forbid(unsafe_code)]

use crate::backend::RunStatusStore;
use crate::context::TrackerContext;
use rl_core::clock::now_ms;
use rl_core::ids::ChainConfigId;
use rl_core::model::ExecutionStatus;
use rl_storage::RunStatusAppendRequest;
use serde::Serialize;

/// Outcome of one crash-recovery pass, for the host's startup health output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Groups found without a terminal record.
    pub orphaned: usize,
    /// Groups closed with a DEAD record by this pass.
    pub repaired: usize,
    /// Groups whose DEAD record could not be written.
    pub failed: usize,
    /// Set when the orphan query itself failed and nothing was attempted.
    pub query_failed: bool,
}

impl<S: RunStatusStore> TrackerContext<S> {
    /// Closes every run this client left open when its previous process died.
    ///
    /// Call once at startup, before the first run is admitted: a run started concurrently
    /// by this client would look orphaned and be closed. Failures are logged and never block
    /// startup.
    pub fn reconcile(&self) -> ReconcileReport {
        let cancel = self.operation_token();
        let client_name = self.client_name();

        let orphaned = match self.store().orphaned_groups(&cancel, client_name) {
            Ok(groups) => groups,
            Err(err) => {
                tracing::error!(
                    client_name = %client_name,
                    error = %err,
                    "error occurred during reverting from the scheduler crash"
                );
                return ReconcileReport {
                    query_failed: true,
                    ..ReconcileReport::default()
                };
            }
        };

        let mut report = ReconcileReport {
            orphaned: orphaned.len(),
            ..ReconcileReport::default()
        };
        for start_status in orphaned {
            let request = RunStatusAppendRequest {
                client_name: client_name.clone(),
                chain_id: None,
                chain_config_id: ChainConfigId::NONE,
                status: ExecutionStatus::Dead,
                start_status: Some(start_status),
                started_at_ms: now_ms(),
                current_execution_element: None,
            };
            match self.store().append(&cancel, request) {
                Ok(run_status_id) => {
                    report.repaired += 1;
                    tracing::info!(
                        client_name = %client_name,
                        start_status = %start_status,
                        run_status_id = %run_status_id,
                        "orphaned chain run marked dead"
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::error!(
                        client_name = %client_name,
                        start_status = %start_status,
                        error = %err,
                        "error occurred during reverting from the scheduler crash"
                    );
                }
            }
        }

        if report.orphaned > 0 {
            tracing::info!(
                client_name = %client_name,
                orphaned = report.orphaned,
                repaired = report.repaired,
                failed = report.failed,
                "crash recovery finished"
            );
        }
        report
    }
}
