#![forbid(unsafe_code)]

use rl_core::ids::{ChainConfigId, StartStatus};
use rl_core::model::ExecutionStatus;
use rusqlite::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("store connection is closed")]
    Unreachable,
    #[error("store connection lock poisoned")]
    LockPoisoned,
    #[error("operation cancelled")]
    Cancelled,
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("transition rejected (start_status={start_status}, status={status})")]
    TransitionRejected {
        start_status: StartStatus,
        status: ExecutionStatus,
    },
    #[error("chain config integrity violated (chain_config_id={chain_config_id}, rows={rows})")]
    ConfigIntegrity {
        chain_config_id: ChainConfigId,
        rows: usize,
    },
}

/// Coarse failure classes callers branch on. "No rows" is never one of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreErrorKind {
    StoreUnreachable,
    QueryFailure,
    WriteFailure,
    Cancelled,
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            Self::Io(_) | Self::Unreachable | Self::LockPoisoned => StoreErrorKind::StoreUnreachable,
            Self::Cancelled => StoreErrorKind::Cancelled,
            Self::Sql(err) if is_connection_failure(err) => StoreErrorKind::StoreUnreachable,
            Self::Sql(_) => StoreErrorKind::QueryFailure,
            Self::InvalidInput(_) | Self::TransitionRejected { .. } | Self::ConfigIntegrity { .. } => {
                StoreErrorKind::WriteFailure
            }
        }
    }

    /// An interrupted statement, or a lock wait abandoned because the caller cancelled,
    /// surfaces as `Cancelled`.
    pub(crate) fn from_aborted(err: StoreError, cancelled: bool) -> StoreError {
        match err {
            Self::Sql(rusqlite::Error::SqliteFailure(code, _))
                if code.code == ErrorCode::OperationInterrupted =>
            {
                Self::Cancelled
            }
            Self::Sql(rusqlite::Error::SqliteFailure(code, _))
                if cancelled
                    && matches!(code.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
            {
                Self::Cancelled
            }
            other => other,
        }
    }
}

fn is_connection_failure(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => matches!(
            code.code,
            ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::PermissionDenied
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_maps_to_cancelled() {
        let interrupted = StoreError::Sql(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT),
            None,
        ));
        let mapped = StoreError::from_aborted(interrupted, false);
        assert!(matches!(mapped, StoreError::Cancelled));
        assert_eq!(mapped.kind(), StoreErrorKind::Cancelled);
    }

    #[test]
    fn busy_maps_to_cancelled_only_after_the_caller_cancelled() {
        let busy = || {
            StoreError::Sql(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                None,
            ))
        };
        assert!(matches!(
            StoreError::from_aborted(busy(), true),
            StoreError::Cancelled
        ));
        assert_eq!(
            StoreError::from_aborted(busy(), false).kind(),
            StoreErrorKind::QueryFailure
        );
    }

    #[test]
    fn kinds_follow_the_failure_taxonomy() {
        assert_eq!(StoreError::Unreachable.kind(), StoreErrorKind::StoreUnreachable);
        assert_eq!(
            StoreError::Sql(rusqlite::Error::QueryReturnedNoRows).kind(),
            StoreErrorKind::QueryFailure
        );
        assert_eq!(
            StoreError::ConfigIntegrity {
                chain_config_id: ChainConfigId::new(4),
                rows: 2
            }
            .kind(),
            StoreErrorKind::WriteFailure
        );
    }
}
