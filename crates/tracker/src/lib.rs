#![forbid(unsafe_code)]

//! Execution tracking for chain runs on a shared ledger: admission control, crash recovery,
//! run lifecycle records, self-destructing configurations and store liveness.
//!
//! Every operation goes through a [`TrackerContext`] and converts store failures into a
//! conservative answer after logging them; none of them raise.

mod admission;
mod backend;
mod config;
mod context;
mod lifecycle;
mod liveness;
mod recovery;
mod self_destruct;

pub use backend::RunStatusStore;
pub use config::{
    ConfigError, ENV_BUSY_TIMEOUT_MS, ENV_CLIENT_NAME, ENV_OPERATION_TIMEOUT_MS, ENV_STORAGE_DIR,
    TrackerConfig,
};
pub use context::{ChainElementExecution, TrackerContext, TrackerError};
pub use recovery::ReconcileReport;
pub use rl_core::APP_LOCK_KEY;
pub use rl_storage::CancelToken;
