#![forbid(unsafe_code)]

use crate::backend::RunStatusStore;
use crate::context::TrackerContext;

impl<S: RunStatusStore> TrackerContext<S> {
    /// Whether the store answers a trivial round-trip. No side effects.
    pub fn is_alive(&self) -> bool {
        match self.store().ping(&self.operation_token()) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(error = %err, "store liveness check failed");
                false
            }
        }
    }
}
