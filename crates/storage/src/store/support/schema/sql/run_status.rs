#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        -- Chain-run ledger. Append-only: one STARTED record opens a group keyed by
        -- (client_name, start_status), exactly one terminal record closes it.
        -- A STARTED record's start_status is its own run_status_id.
        CREATE TABLE IF NOT EXISTS run_status (
          run_status_id INTEGER PRIMARY KEY,
          chain_id INTEGER,
          chain_config_id INTEGER NOT NULL DEFAULT 0,  -- 0: no specific config (synthetic DEAD)
          client_name TEXT NOT NULL,
          execution_status TEXT NOT NULL
            CHECK(execution_status IN ('STARTED', 'CHAIN_FAILED', 'CHAIN_DONE', 'DEAD')),
          start_status INTEGER NOT NULL,
          started_at_ms INTEGER NOT NULL,
          last_status_update_ms INTEGER NOT NULL,
          current_execution_element INTEGER
        );

        CREATE TRIGGER IF NOT EXISTS run_status_no_update
          BEFORE UPDATE ON run_status
        BEGIN
          SELECT RAISE(ABORT, 'run_status is append-only');
        END;

        CREATE TRIGGER IF NOT EXISTS run_status_no_delete
          BEFORE DELETE ON run_status
        BEGIN
          SELECT RAISE(ABORT, 'run_status is append-only');
        END;

        -- Groups that were started and have not reached a terminal record.
        CREATE VIEW IF NOT EXISTS running_runs AS
          SELECT s.start_status, s.client_name, s.chain_id, s.chain_config_id, s.started_at_ms
          FROM run_status AS s
          WHERE s.execution_status = 'STARTED'
            AND NOT EXISTS (
              SELECT 1 FROM run_status AS t
              WHERE t.client_name = s.client_name
                AND t.start_status = s.start_status
                AND t.execution_status <> 'STARTED'
            );
"#;
