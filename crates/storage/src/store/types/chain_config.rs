#![forbid(unsafe_code)]

use rl_core::ids::{ChainConfigId, ChainId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainConfigRow {
    pub chain_config_id: ChainConfigId,
    pub chain_id: Option<ChainId>,
    pub chain_name: String,
    /// `None` means no concurrency ceiling.
    pub max_instances: Option<u32>,
    pub self_destruct: bool,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct ChainConfigUpsertRequest {
    pub chain_config_id: ChainConfigId,
    pub chain_id: Option<ChainId>,
    pub chain_name: String,
    pub max_instances: Option<u32>,
    pub self_destruct: bool,
}
