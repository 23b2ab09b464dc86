#![forbid(unsafe_code)]

use crate::backend::RunStatusStore;
use crate::context::TrackerContext;
use rl_core::ids::ChainConfigId;
use rl_core::model::Lookup;

impl<S: RunStatusStore> TrackerContext<S> {
    /// Whether another run of `chain_config_id` may start under a ceiling of `max_instances`.
    ///
    /// Nothing running admits; a count admits while below the ceiling; a failed query refuses.
    /// The check and the following `start_run` are separate writes, so two callers can both be
    /// admitted in between: the ceiling holds only under the single-active-scheduler lock.
    pub fn can_proceed(&self, chain_config_id: ChainConfigId, max_instances: u32) -> bool {
        tracing::debug!(
            chain_config_id = %chain_config_id,
            max_instances,
            "checking if chain run can proceed"
        );
        match self
            .store()
            .count_running(&self.operation_token(), chain_config_id)
        {
            Lookup::NotFound => true,
            Lookup::Found(running) => running < u64::from(max_instances),
            Lookup::Failure(err) => {
                tracing::error!(
                    chain_config_id = %chain_config_id,
                    error = %err,
                    "cannot read information about concurrently running chains"
                );
                false
            }
        }
    }

    /// `can_proceed` with the ceiling read from the chain's registered configuration.
    ///
    /// An unknown configuration has nothing to run and refuses; no ceiling admits.
    pub fn can_proceed_configured(&self, chain_config_id: ChainConfigId) -> bool {
        match self
            .store()
            .chain_config(&self.operation_token(), chain_config_id)
        {
            Lookup::Found(config) => match config.max_instances {
                Some(max_instances) => self.can_proceed(chain_config_id, max_instances),
                None => true,
            },
            Lookup::NotFound => {
                tracing::info!(
                    chain_config_id = %chain_config_id,
                    "chain configuration not found; refusing to start"
                );
                false
            }
            Lookup::Failure(err) => {
                tracing::error!(
                    chain_config_id = %chain_config_id,
                    error = %err,
                    "cannot read chain configuration"
                );
                false
            }
        }
    }
}
