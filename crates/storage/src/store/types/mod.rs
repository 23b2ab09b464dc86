#![forbid(unsafe_code)]

mod chain_config;
mod run_status;

pub use chain_config::*;
pub use run_status::*;
