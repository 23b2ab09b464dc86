#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        -- Owned by chain-definition tooling. This store reads max_instances and deletes
        -- self-destructing rows once their run is over.
        CREATE TABLE IF NOT EXISTS chain_execution_config (
          chain_config_id INTEGER PRIMARY KEY CHECK(chain_config_id > 0),
          chain_id INTEGER,
          chain_name TEXT NOT NULL,
          max_instances INTEGER CHECK(max_instances IS NULL OR max_instances >= 0),
          self_destruct INTEGER NOT NULL DEFAULT 0,
          created_at_ms INTEGER NOT NULL
        );
"#;
