use thiserror::Error;

/// Error taxonomy for every client-side operation.
///
/// Validation failures are rejected before any network call; backend errors
/// carry a transience flag so callers know whether a retry with backoff is
/// worthwhile; subscription errors feed the realtime reconnect loop and are
/// only surfaced once its attempt budget is spent. A conflicting insert is
/// never an error anywhere in this crate: the conversation upsert absorbs it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed or missing identifiers, rejected before any network call.
    #[error("validation failed: {reason}")]
    Validation {
        /// Human-readable description of the rejected input.
        reason: String,
    },

    /// Network or storage failure reported by the backend collaborator.
    #[error("backend request failed: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
        /// Whether a retry with backoff is worthwhile.
        transient: bool,
    },

    /// Realtime channel failure, consumed by the listener's reconnect loop.
    #[error("realtime subscription failed: {message}")]
    Subscription {
        /// Description of the channel failure.
        message: String,
    },

    /// A collaborator handed back a row this client could not decode.
    #[error("malformed {entity} record: {message}")]
    Decode {
        /// Entity name the row was expected to decode into.
        entity: &'static str,
        /// Description of the decode failure.
        message: String,
    },

    /// The requested record does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// Entity name that was looked up.
        entity: &'static str,
    },
}

impl ClientError {
    /// Builds a validation error from any displayable reason.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Builds a retry-eligible backend error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            transient: true,
        }
    }

    /// Builds a non-retryable backend error.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            transient: false,
        }
    }

    /// Builds a subscription error.
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }

    /// Whether the operation may succeed if retried with backoff.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Backend {
                transient: true,
                ..
            } | Self::Subscription { .. }
        )
    }
}

/// Convenience alias used across services and backends.
pub type ClientResult<T> = Result<T, ClientError>;
