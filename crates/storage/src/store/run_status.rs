#![forbid(unsafe_code)]

use super::*;
use rl_core::ids::{ChainConfigId, ChainId, ClientName, RunStatusId, StartStatus, TaskId};
use rl_core::model::{ExecutionStatus, Lookup};
use rusqlite::{OptionalExtension, params};
use rusqlite::types::{FromSqlError, Type};

// Opens a new group: the generated id doubles as the group's start_status.
// One statement, so the id allocation and the insert are atomic under SQLite's write lock.
const SQL_APPEND_STARTED: &str = r#"
    INSERT INTO run_status(
      run_status_id, chain_id, chain_config_id, client_name, execution_status,
      start_status, started_at_ms, last_status_update_ms, current_execution_element
    )
    SELECT next_id, ?1, ?2, ?3, 'STARTED', next_id, ?4, ?5, ?6
    FROM (SELECT COALESCE(MAX(run_status_id), 0) + 1 AS next_id FROM run_status)
"#;

// CHAIN_DONE / CHAIN_FAILED close a started group that has no terminal record yet.
const SQL_APPEND_TERMINAL: &str = r#"
    INSERT INTO run_status(
      chain_id, chain_config_id, client_name, execution_status,
      start_status, started_at_ms, last_status_update_ms, current_execution_element
    )
    SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
    WHERE EXISTS (
        SELECT 1 FROM run_status
        WHERE client_name=?3 AND start_status=?5 AND execution_status='STARTED'
      )
      AND NOT EXISTS (
        SELECT 1 FROM run_status
        WHERE client_name=?3 AND start_status=?5 AND execution_status<>'STARTED'
      )
"#;

// DEAD closes a group that still holds a single record, whatever that record is.
// Re-checked inside the statement so racing reconcilers cannot both close one group.
const SQL_APPEND_DEAD: &str = r#"
    INSERT INTO run_status(
      chain_id, chain_config_id, client_name, execution_status,
      start_status, started_at_ms, last_status_update_ms, current_execution_element
    )
    SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
    WHERE (
      SELECT COUNT(*) FROM run_status WHERE client_name=?3 AND start_status=?5
    ) = 1
"#;

const SQL_RUN_STATUS_COLUMNS: &str = "run_status_id, chain_id, chain_config_id, client_name, \
     execution_status, start_status, started_at_ms, last_status_update_ms, current_execution_element";

fn read_run_status_row(row: &rusqlite::Row<'_>) -> Result<RunStatusRow, rusqlite::Error> {
    let raw_status: String = row.get(4)?;
    let execution_status = ExecutionStatus::parse(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(FromSqlError::InvalidType))
    })?;
    Ok(RunStatusRow {
        run_status_id: RunStatusId::new(row.get(0)?),
        chain_id: row.get::<_, Option<i64>>(1)?.map(ChainId::new),
        chain_config_id: ChainConfigId::new(row.get(2)?),
        client_name: row.get(3)?,
        execution_status,
        start_status: StartStatus::new(row.get(5)?),
        started_at_ms: row.get(6)?,
        last_status_update_ms: row.get(7)?,
        current_execution_element: row.get::<_, Option<i64>>(8)?.map(TaskId::new),
    })
}

fn read_running_run_row(row: &rusqlite::Row<'_>) -> Result<RunningRunRow, rusqlite::Error> {
    Ok(RunningRunRow {
        start_status: StartStatus::new(row.get(0)?),
        client_name: row.get(1)?,
        chain_id: row.get::<_, Option<i64>>(2)?.map(ChainId::new),
        chain_config_id: ChainConfigId::new(row.get(3)?),
        started_at_ms: row.get(4)?,
    })
}

fn validate_append(request: &RunStatusAppendRequest) -> Result<(), StoreError> {
    match (request.status, request.start_status) {
        (ExecutionStatus::Started, None) => {}
        (ExecutionStatus::Started, Some(_)) => {
            return Err(StoreError::InvalidInput(
                "run_status.start_status is assigned by the store for STARTED",
            ));
        }
        (_, None) => {
            return Err(StoreError::InvalidInput(
                "run_status.start_status is required for terminal statuses",
            ));
        }
        (_, Some(start_status)) if !start_status.is_valid() => {
            return Err(StoreError::InvalidInput("run_status.start_status is invalid"));
        }
        (_, Some(_)) => {}
    }
    if request.chain_config_id.get() < 0 {
        return Err(StoreError::InvalidInput("run_status.chain_config_id is negative"));
    }
    if request.chain_id.is_some_and(|id| !id.is_valid()) {
        return Err(StoreError::InvalidInput("run_status.chain_id is invalid"));
    }
    Ok(())
}

impl SqliteStore {
    /// Appends one ledger record and returns its generated id.
    ///
    /// `last_status_update_ms` comes from the store clock read once for this write;
    /// `started_at_ms` is taken from the request untouched.
    pub fn run_status_append(
        &self,
        cancel: &CancelToken,
        request: RunStatusAppendRequest,
    ) -> Result<RunStatusId, StoreError> {
        validate_append(&request)?;
        self.with_conn(cancel, |conn| {
            let tx_clock_ms = now_ms();
            let chain_id = request.chain_id.map(ChainId::get);
            let element = request.current_execution_element.map(TaskId::get);

            let Some(start_status) = request.start_status else {
                conn.execute(
                    SQL_APPEND_STARTED,
                    params![
                        chain_id,
                        request.chain_config_id.get(),
                        request.client_name.as_str(),
                        request.started_at_ms,
                        tx_clock_ms,
                        element,
                    ],
                )?;
                return Ok(RunStatusId::new(conn.last_insert_rowid()));
            };

            let sql = match request.status {
                ExecutionStatus::Dead => SQL_APPEND_DEAD,
                _ => SQL_APPEND_TERMINAL,
            };
            let inserted = conn.execute(
                sql,
                params![
                    chain_id,
                    request.chain_config_id.get(),
                    request.client_name.as_str(),
                    request.status.as_str(),
                    start_status.get(),
                    request.started_at_ms,
                    tx_clock_ms,
                    element,
                ],
            )?;
            if inserted == 0 {
                return Err(StoreError::TransitionRejected {
                    start_status,
                    status: request.status,
                });
            }
            Ok(RunStatusId::new(conn.last_insert_rowid()))
        })
    }

    /// Number of runs of `chain_config_id` that are started and not yet terminal,
    /// across every client. `NotFound` when nothing is running.
    pub fn running_count(
        &self,
        cancel: &CancelToken,
        chain_config_id: ChainConfigId,
    ) -> Lookup<u64, StoreError> {
        Lookup::from_result(self.with_conn(cancel, |conn| {
            let count = conn
                .query_row(
                    "SELECT COUNT(*) FROM running_runs WHERE chain_config_id=?1 \
                     GROUP BY chain_config_id",
                    params![chain_config_id.get()],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            Ok(count.map(|count| u64::try_from(count).unwrap_or(0)))
        }))
    }

    pub fn running_runs(
        &self,
        cancel: &CancelToken,
        chain_config_id: ChainConfigId,
    ) -> Result<Vec<RunningRunRow>, StoreError> {
        self.with_conn(cancel, |conn| {
            let mut stmt = conn.prepare(
                "SELECT start_status, client_name, chain_id, chain_config_id, started_at_ms \
                 FROM running_runs WHERE chain_config_id=?1 \
                 ORDER BY start_status ASC",
            )?;
            let rows = stmt.query_map(params![chain_config_id.get()], read_running_run_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    /// Groups of `client_name` holding fewer than two records: started but never closed.
    pub fn orphaned_groups(
        &self,
        cancel: &CancelToken,
        client_name: &ClientName,
    ) -> Result<Vec<StartStatus>, StoreError> {
        self.with_conn(cancel, |conn| {
            let mut stmt = conn.prepare(
                "SELECT start_status FROM run_status \
                 WHERE client_name=?1 \
                 GROUP BY start_status \
                 HAVING COUNT(*) < 2 \
                 ORDER BY start_status ASC",
            )?;
            let rows = stmt.query_map(params![client_name.as_str()], |row| {
                row.get::<_, i64>(0).map(StartStatus::new)
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    /// Records of one group in the order they were written.
    pub fn run_group(
        &self,
        cancel: &CancelToken,
        client_name: &ClientName,
        start_status: StartStatus,
    ) -> Result<Vec<RunStatusRow>, StoreError> {
        self.with_conn(cancel, |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SQL_RUN_STATUS_COLUMNS} FROM run_status \
                 WHERE client_name=?1 AND start_status=?2 \
                 ORDER BY run_status_id ASC"
            ))?;
            let rows = stmt.query_map(
                params![client_name.as_str(), start_status.get()],
                read_run_status_row,
            )?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    pub fn run_status_get(
        &self,
        cancel: &CancelToken,
        run_status_id: RunStatusId,
    ) -> Lookup<RunStatusRow, StoreError> {
        Lookup::from_result(self.with_conn(cancel, |conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {SQL_RUN_STATUS_COLUMNS} FROM run_status WHERE run_status_id=?1"
                    ),
                    params![run_status_id.get()],
                    read_run_status_row,
                )
                .optional()?)
        }))
    }
}
