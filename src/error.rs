//! Error types for list fetching and mutation flows.

use thiserror::Error;

/// Raw I/O failure reported by a [`ListSource`](crate::ListSource) or
/// [`MutationTarget`](crate::MutationTarget) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request never reached the server or the connection dropped.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The transport gave up waiting for a response.
    #[error("request timed out")]
    Timeout,

    /// The response body could not be decoded.
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// A list query failed.
///
/// Always retryable by re-issuing the same [`RequestKey`](crate::RequestKey).
/// The fetcher keeps the last one in its snapshot, hence `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not be completed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error("server responded with status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Body text or server message, possibly empty.
        message: String,
    },

    /// The server answered 2xx but reported `success: false`.
    #[error("server rejected the query: {message}")]
    Rejected {
        /// Server-supplied message.
        message: String,
    },
}

impl FetchError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Terminal rejection of a mutation.
///
/// No override path exists; the flow only offers dismissal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HardFailure {
    /// Human-readable summary from the server, or the raw transport message.
    pub message: String,
    /// Itemized reasons blocking the action, if the server enumerated any.
    pub blocking_reasons: Vec<String>,
}

impl HardFailure {
    /// Failure with no itemized reasons.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            blocking_reasons: Vec::new(),
        }
    }

    /// Failure carrying the server's blocking reasons.
    pub fn with_reasons(message: impl Into<String>, blocking_reasons: Vec<String>) -> Self {
        Self {
            message: message.into(),
            blocking_reasons,
        }
    }

    /// Message followed by each blocking reason on its own line.
    pub fn describe(&self) -> String {
        if self.blocking_reasons.is_empty() {
            return self.message.clone();
        }
        let mut out = self.message.clone();
        for reason in &self.blocking_reasons {
            out.push_str("\n- ");
            out.push_str(reason);
        }
        out
    }
}

/// Misuse of the mutation state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// The requested transition is not allowed from the current state.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        /// The attempted operation.
        action: &'static str,
        /// Name of the current state.
        state: &'static str,
    },

    /// A mutation is already executing.
    #[error("a mutation is already in flight")]
    Busy,

    /// The controller was built without a mutation target.
    #[error("no mutation target configured")]
    NoTarget,
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document was malformed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
