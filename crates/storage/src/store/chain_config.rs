#![forbid(unsafe_code)]

use super::*;
use rl_core::ids::{ChainConfigId, ChainId};
use rl_core::model::Lookup;
use rusqlite::{OptionalExtension, params};

const MAX_CHAIN_NAME_LEN: usize = 200;

fn normalize_chain_name(raw: &str) -> Result<String, StoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(StoreError::InvalidInput("chain_config.chain_name must not be empty"));
    }
    if raw.len() > MAX_CHAIN_NAME_LEN {
        return Err(StoreError::InvalidInput("chain_config.chain_name is too long"));
    }
    Ok(raw.to_string())
}

fn read_chain_config_row(row: &rusqlite::Row<'_>) -> Result<ChainConfigRow, rusqlite::Error> {
    let max_instances = match row.get::<_, Option<i64>>(3)? {
        Some(value) => Some(from_sqlite_u32(3, value)?),
        None => None,
    };
    Ok(ChainConfigRow {
        chain_config_id: ChainConfigId::new(row.get(0)?),
        chain_id: row.get::<_, Option<i64>>(1)?.map(ChainId::new),
        chain_name: row.get(2)?,
        max_instances,
        self_destruct: row.get::<_, i64>(4)? != 0,
        created_at_ms: row.get(5)?,
    })
}

impl SqliteStore {
    /// Registers or replaces a chain configuration. Used by chain-definition tooling;
    /// the tracker itself only reads and self-destructs configurations.
    pub fn chain_config_upsert(
        &self,
        cancel: &CancelToken,
        request: ChainConfigUpsertRequest,
    ) -> Result<ChainConfigRow, StoreError> {
        if !request.chain_config_id.is_valid() {
            return Err(StoreError::InvalidInput("chain_config_id must be positive"));
        }
        let chain_name = normalize_chain_name(&request.chain_name)?;
        self.with_conn(cancel, |conn| {
            let now_ms = now_ms();
            conn.execute(
                r#"
                INSERT INTO chain_execution_config(
                  chain_config_id, chain_id, chain_name, max_instances, self_destruct, created_at_ms
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(chain_config_id) DO UPDATE SET
                  chain_id=excluded.chain_id,
                  chain_name=excluded.chain_name,
                  max_instances=excluded.max_instances,
                  self_destruct=excluded.self_destruct
                "#,
                params![
                    request.chain_config_id.get(),
                    request.chain_id.map(ChainId::get),
                    chain_name.as_str(),
                    request.max_instances.map(to_sqlite_i64),
                    i64::from(request.self_destruct),
                    now_ms,
                ],
            )?;
            Ok(conn.query_row(
                "SELECT chain_config_id, chain_id, chain_name, max_instances, self_destruct, created_at_ms \
                 FROM chain_execution_config WHERE chain_config_id=?1",
                params![request.chain_config_id.get()],
                read_chain_config_row,
            )?)
        })
    }

    pub fn chain_config_get(
        &self,
        cancel: &CancelToken,
        chain_config_id: ChainConfigId,
    ) -> Lookup<ChainConfigRow, StoreError> {
        Lookup::from_result(self.with_conn(cancel, |conn| {
            Ok(conn
                .query_row(
                    "SELECT chain_config_id, chain_id, chain_name, max_instances, self_destruct, created_at_ms \
                     FROM chain_execution_config WHERE chain_config_id=?1",
                    params![chain_config_id.get()],
                    read_chain_config_row,
                )
                .optional()?)
        }))
    }

    /// Deletes the configuration row(s) for `chain_config_id` and reports how many went.
    pub fn chain_config_delete(
        &self,
        cancel: &CancelToken,
        chain_config_id: ChainConfigId,
    ) -> Result<usize, StoreError> {
        self.with_conn(cancel, |conn| {
            Ok(conn.execute(
                "DELETE FROM chain_execution_config WHERE chain_config_id=?1",
                params![chain_config_id.get()],
            )?)
        })
    }
}
