#![forbid(unsafe_code)]

use crate::backend::RunStatusStore;
use crate::context::TrackerContext;
use rl_core::ids::ChainConfigId;
use rl_storage::StoreError;

impl<S: RunStatusStore> TrackerContext<S> {
    /// Deletes a one-shot chain's configuration after its final status is recorded.
    ///
    /// `true` only when exactly one row went. Zero rows means another caller already removed
    /// it; more than one means `chain_config_id` is not unique and is reported as an
    /// integrity violation.
    pub fn remove_self_destruct_config(&self, chain_config_id: ChainConfigId) -> bool {
        tracing::info!(
            chain_config_id = %chain_config_id,
            "deleting self destructive chain configuration"
        );
        let rows = match self
            .store()
            .delete_chain_config(&self.operation_token(), chain_config_id)
        {
            Ok(rows) => rows,
            Err(err) => {
                tracing::error!(
                    chain_config_id = %chain_config_id,
                    error = %err,
                    "error occurred during deleting self destructive chain"
                );
                return false;
            }
        };

        match rows {
            1 => true,
            0 => {
                tracing::info!(
                    chain_config_id = %chain_config_id,
                    "self destructive chain configuration already removed"
                );
                false
            }
            rows => {
                let violation = StoreError::ConfigIntegrity {
                    chain_config_id,
                    rows,
                };
                tracing::error!(
                    chain_config_id = %chain_config_id,
                    rows,
                    error = %violation,
                    "self destructive chain deleted more than one configuration row"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::fake::FakeStore;
    use crate::context::TrackerContext;
    use rl_core::ids::{ChainConfigId, ClientName};
    use rl_storage::ChainConfigRow;
    use std::sync::Arc;

    fn context() -> TrackerContext<FakeStore> {
        TrackerContext::new(
            Arc::new(FakeStore::default()),
            ClientName::try_new("host-a").expect("client"),
        )
    }

    fn config(id: i64) -> ChainConfigRow {
        ChainConfigRow {
            chain_config_id: ChainConfigId::new(id),
            chain_id: None,
            chain_name: "one-shot".to_string(),
            max_instances: Some(1),
            self_destruct: true,
            created_at_ms: 0,
        }
    }

    #[test]
    fn removes_exactly_once() {
        let ctx = context();
        ctx.store().add_config(config(42), 1);
        assert!(ctx.remove_self_destruct_config(ChainConfigId::new(42)));
        assert!(!ctx.remove_self_destruct_config(ChainConfigId::new(42)));
    }

    #[test]
    fn duplicate_rows_are_an_integrity_failure() {
        let ctx = context();
        ctx.store().add_config(config(7), 2);
        assert!(!ctx.remove_self_destruct_config(ChainConfigId::new(7)));
    }

    #[test]
    fn store_error_reports_false() {
        let ctx = context();
        ctx.store().add_config(config(5), 1);
        ctx.store().set_fail_appends(true);
        assert!(!ctx.remove_self_destruct_config(ChainConfigId::new(5)));
    }
}
