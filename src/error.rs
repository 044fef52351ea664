//! Error taxonomy for the queue.
//!
//! Every mutating queue operation surfaces one of these variants; read-only
//! size queries swallow errors instead and report `-1` (see [`crate::Backend::count_queued`]).

/// Errors produced by the queue core or by a backend adapter.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Network/timeout-class failure. Not retried by the executor.
    #[error("backend operation failed: {0}")]
    TransientBackendFailure(String),

    /// A relational backend reported a deadlock on this transition. The
    /// executor retries the whole transition up to `max_retries` times
    /// before this escapes to the caller (spec.md §4.5, §7).
    #[error("deadlock detected: {0}")]
    Deadlock(String),

    /// The requested operation has no meaning on this backend (e.g. `finish`
    /// on a backend with no ephemeral store). Distinct from a transient
    /// failure: retrying will never help.
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    /// The `Codec` could not encode or decode a message payload.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// `init` was called with missing or inconsistent configuration.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A backend-specific error that doesn't cleanly map to one of the
    /// above; carries the original cause for diagnostics.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl QueueError {
    /// True when the failure is transient and a caller-level retry (outside
    /// the executor's own bounded retry) might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            QueueError::TransientBackendFailure(_) | QueueError::Deadlock(_)
        )
    }

    pub(crate) fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        QueueError::Backend(Box::new(err))
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, QueueError>;
