#![forbid(unsafe_code)]

mod chain_config;
mod core;
mod indexes;
mod run_status;

pub(super) fn full_schema_sql() -> String {
    let mut sql = String::new();
    sql.push_str(core::SQL);
    sql.push_str(run_status::SQL);
    sql.push_str(chain_config::SQL);
    sql.push_str(indexes::SQL);
    sql
}
