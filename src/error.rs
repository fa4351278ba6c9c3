//! Failure taxonomy for store operations.

use thiserror::Error;

/// Failure of a store operation.
///
/// Only operational and transport failures live here. Outcomes that are
/// part of normal operation are reported as data instead: an absent key is
/// `None`/empty, a missed compare-and-swap is `Ok(false)`, and a rejected
/// transaction is [`TxnOutcome::Rejected`](crate::TxnOutcome::Rejected).
#[derive(Debug, Error)]
pub enum Error {
    /// The store answered with a non-success status.
    #[error("store returned status {status}: {body}")]
    Status {
        /// HTTP status code as reported by the store.
        status: u16,
        /// Raw response body, preserved for diagnostics.
        body: String,
    },

    /// The exchange did not complete: connection refused, timeout, or the
    /// response never arrived intact.
    #[error("transport failure: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },

    /// A request or response body could not be encoded or decoded.
    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// The base address handed to the constructor was unusable.
    #[error("invalid store address: {reason}")]
    InvalidAddress {
        /// What made the address unusable.
        reason: String,
    },
}

impl Error {
    /// True when the store reported that a path does not exist.
    ///
    /// The store signals absence uniformly with status 404; callers branch
    /// on this predicate instead of comparing raw status codes.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Status { status: 404, .. })
    }

    /// Status code of an operational failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
