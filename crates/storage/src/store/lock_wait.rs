#![forbid(unsafe_code)]

use super::CancelToken;
use std::cell::RefCell;
use std::time::{Duration, Instant};

// Longest single sleep between two attempts at another writer's lock.
const LOCK_WAIT_SLICE: Duration = Duration::from_millis(20);

struct LockWait {
    cancel: CancelToken,
    give_up_at: Option<Instant>,
}

thread_local! {
    static LOCK_WAIT: RefCell<Option<LockWait>> = const { RefCell::new(None) };
}

/// While alive, SQLite lock contention on this thread is waited out in short slices
/// that re-check `cancel`, for at most `budget`.
pub(super) struct LockWaitScope {
    _private: (),
}

impl LockWaitScope {
    pub(super) fn enter(cancel: &CancelToken, budget: Duration) -> Self {
        let wait = LockWait {
            cancel: cancel.clone(),
            give_up_at: Instant::now().checked_add(budget),
        };
        LOCK_WAIT.with(|slot| *slot.borrow_mut() = Some(wait));
        Self { _private: () }
    }
}

impl Drop for LockWaitScope {
    fn drop(&mut self) {
        LOCK_WAIT.with(|slot| *slot.borrow_mut() = None);
    }
}

/// Busy handler installed on every store connection. `true` asks SQLite to retry.
///
/// Outside a [`LockWaitScope`] it never waits.
pub(super) fn wait_for_lock(_attempts: i32) -> bool {
    LOCK_WAIT.with(|slot| {
        let slot = slot.borrow();
        let Some(wait) = slot.as_ref() else {
            return false;
        };
        if wait.cancel.is_cancelled() {
            return false;
        }

        let mut slice = LOCK_WAIT_SLICE;
        if let Some(give_up_at) = wait.give_up_at {
            let left = give_up_at.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return false;
            }
            slice = slice.min(left);
        }
        if let Some(remaining) = wait.cancel.remaining() {
            slice = slice.min(remaining);
        }

        std::thread::sleep(slice);
        !wait.cancel.is_cancelled()
    })
}
