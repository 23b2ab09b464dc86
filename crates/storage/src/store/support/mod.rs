#![forbid(unsafe_code)]

mod schema;

pub(super) use schema::{SCHEMA_VERSION, install_schema, preflight_gate};
pub(super) use rl_core::clock::now_ms;
