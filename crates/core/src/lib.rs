#![forbid(unsafe_code)]

/// Key of the process-wide advisory lock that keeps a single scheduler active per store.
///
/// Fixed value shared by every scheduler instance. Acquiring and holding the lock is the host's job;
/// admission and crash recovery assume it is held.
pub const APP_LOCK_KEY: i64 = 0x204F_04EE;

pub mod ids {
    const MAX_CLIENT_NAME_LEN: usize = 128;

    /// Label of one scheduler instance. Partitions crash recovery so an instance never
    /// reconciles another instance's runs.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ClientName(String);

    impl ClientName {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, ClientNameError> {
            let value = value.into();
            validate_client_name(&value)?;
            Ok(Self(value))
        }
    }

    impl std::fmt::Display for ClientName {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum ClientNameError {
        Empty,
        TooLong,
        ControlChar { index: usize },
    }

    impl std::fmt::Display for ClientNameError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Empty => write!(f, "client name must not be empty"),
                Self::TooLong => write!(f, "client name exceeds {MAX_CLIENT_NAME_LEN} bytes"),
                Self::ControlChar { index } => {
                    write!(f, "client name has a control character at {index}")
                }
            }
        }
    }

    impl std::error::Error for ClientNameError {}

    fn validate_client_name(value: &str) -> Result<(), ClientNameError> {
        if value.is_empty() {
            return Err(ClientNameError::Empty);
        }
        if value.len() > MAX_CLIENT_NAME_LEN {
            return Err(ClientNameError::TooLong);
        }
        if let Some((index, _)) = value.char_indices().find(|(_, ch)| ch.is_control()) {
            return Err(ClientNameError::ControlChar { index });
        }
        Ok(())
    }

    macro_rules! store_id {
        ($(#[$meta:meta])* $name:ident) => {
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(i64);

            impl $name {
                pub const fn new(value: i64) -> Self {
                    Self(value)
                }

                pub const fn get(self) -> i64 {
                    self.0
                }

                pub const fn is_valid(self) -> bool {
                    self.0 > 0
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        };
    }

    store_id!(ChainId);
    store_id!(
        /// `ChainConfigId::NONE` marks records that belong to no specific configuration
        /// (synthetic DEAD records written by crash recovery).
        ChainConfigId
    );
    store_id!(
        /// Generated by the store. `RunStatusId::INVALID` means no record was written.
        RunStatusId
    );
    store_id!(
        /// Grouping key of one logical run: the `RunStatusId` of its STARTED record.
        StartStatus
    );
    store_id!(TaskId);

    impl ChainConfigId {
        pub const NONE: Self = Self(0);
    }

    impl RunStatusId {
        pub const INVALID: Self = Self(0);

        pub const fn as_start_status(self) -> StartStatus {
            StartStatus(self.0)
        }
    }
}

pub mod model {
    /// Status of a chain-run ledger record.
    ///
    /// A group starts with exactly one `Started` record and is closed by exactly one
    /// terminal record. Nothing is appended after a terminal status.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum ExecutionStatus {
        Started,
        ChainFailed,
        ChainDone,
        Dead,
    }

    impl ExecutionStatus {
        pub const ALL: [ExecutionStatus; 4] = [
            ExecutionStatus::Started,
            ExecutionStatus::ChainFailed,
            ExecutionStatus::ChainDone,
            ExecutionStatus::Dead,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                ExecutionStatus::Started => "STARTED",
                ExecutionStatus::ChainFailed => "CHAIN_FAILED",
                ExecutionStatus::ChainDone => "CHAIN_DONE",
                ExecutionStatus::Dead => "DEAD",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            let value = value.trim();
            Self::ALL
                .into_iter()
                .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value))
        }

        pub fn is_terminal(self) -> bool {
            !matches!(self, ExecutionStatus::Started)
        }

        /// Whether a record with status `next` may follow a group whose last record is `self`.
        pub fn can_transition_to(self, next: ExecutionStatus) -> bool {
            matches!(self, ExecutionStatus::Started) && next.is_terminal()
        }
    }

    impl std::fmt::Display for ExecutionStatus {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.as_str())
        }
    }

    /// Outcome of a read where "no rows" is a definite answer rather than an error.
    #[derive(Debug)]
    pub enum Lookup<T, E> {
        Found(T),
        NotFound,
        Failure(E),
    }

    impl<T, E> Lookup<T, E> {
        pub fn from_result(value: Result<Option<T>, E>) -> Self {
            match value {
                Ok(Some(value)) => Lookup::Found(value),
                Ok(None) => Lookup::NotFound,
                Err(err) => Lookup::Failure(err),
            }
        }
    }
}

pub mod clock {
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Wall-clock milliseconds since the Unix epoch; 0 if the clock reads before it.
    pub fn now_ms() -> i64 {
        let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration,
            Err(_) => return 0,
        };

        i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
    }
}
