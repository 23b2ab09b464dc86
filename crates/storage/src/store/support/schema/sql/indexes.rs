#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE INDEX IF NOT EXISTS idx_run_status_client_group
          ON run_status(client_name, start_status);

        CREATE INDEX IF NOT EXISTS idx_run_status_config_status
          ON run_status(chain_config_id, execution_status);
"#;
