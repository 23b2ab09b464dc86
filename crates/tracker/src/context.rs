#![forbid(unsafe_code)]

use crate::backend::RunStatusStore;
use crate::config::TrackerConfig;
use rl_core::ids::{ChainConfigId, ChainId, ClientName, ClientNameError, TaskId};
use rl_storage::{CancelToken, SqliteStore, StoreError};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("invalid client name: {0}")]
    ClientName(#[from] ClientNameError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything an operation needs: the shared store, this instance's identity, and the
/// caller's cancellation signal.
///
/// Admission control and crash recovery assume the host holds the single-active-scheduler
/// lock (`rl_core::APP_LOCK_KEY`) for this client identity; without it their bounds are
/// best effort under concurrent writers.
pub struct TrackerContext<S = SqliteStore> {
    store: Arc<S>,
    client_name: ClientName,
    cancel: CancelToken,
    operation_timeout: Option<Duration>,
}

impl<S> Clone for TrackerContext<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            client_name: self.client_name.clone(),
            cancel: self.cancel.clone(),
            operation_timeout: self.operation_timeout,
        }
    }
}

impl TrackerContext<SqliteStore> {
    /// Opens the store described by `config` and binds this process's client identity.
    pub fn open(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let client_name = ClientName::try_new(config.client_name.clone())?;
        let store = SqliteStore::open_with(&config.storage_dir, config.store_options())?;
        let mut context = Self::new(Arc::new(store), client_name);
        context.operation_timeout = config.operation_timeout();
        Ok(context)
    }
}

impl<S: RunStatusStore> TrackerContext<S> {
    pub fn new(store: Arc<S>, client_name: ClientName) -> Self {
        Self {
            store,
            client_name,
            cancel: CancelToken::new(),
            operation_timeout: None,
        }
    }

    /// Same store and identity, driven by another cancellation signal (e.g. one per request).
    pub fn with_cancel(&self, cancel: CancelToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn client_name(&self) -> &ClientName {
        &self.client_name
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Token for one store call: the caller's signal, tightened by the per-operation timeout.
    pub(crate) fn operation_token(&self) -> CancelToken {
        match self.operation_timeout {
            Some(timeout) => self.cancel.child_with_timeout(timeout),
            None => self.cancel.clone(),
        }
    }

    /// Shutdown hook: closes the store connection. Idempotent and never exits the process;
    /// the host calls it from its own signal handling before exit.
    pub fn finalize(&self) -> bool {
        match self.store.finalize() {
            Ok(true) => {
                tracing::info!(client_name = %self.client_name, "store connection finalized");
                true
            }
            Ok(false) => {
                tracing::debug!(client_name = %self.client_name, "store connection already finalized");
                false
            }
            Err(err) => {
                tracing::error!(
                    client_name = %self.client_name,
                    error = %err,
                    "failed to finalize store connection"
                );
                false
            }
        }
    }
}

/// The chain element whose run is being recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainElementExecution {
    pub chain_id: ChainId,
    pub chain_config_id: ChainConfigId,
    /// Task executing when the status was produced, if any.
    pub task_id: Option<TaskId>,
}
