//! Atomic multi-key transactions.
//!
//! [`Transaction`] is a fluent builder over the closed verb set in
//! [`TxnOp`]. The store applies the batch in exactly the order it was
//! built, and the whole batch applies or none of it does. Committing
//! consumes the builder, so a submitted sequence can never be extended or
//! resubmitted by accident.
//!
//! ```rust,ignore
//! let outcome = Transaction::new()
//!     .set("jobs/leader", b"node-4".to_vec())
//!     .cas("jobs/epoch", b"18".to_vec(), last_epoch_index)
//!     .commit(&client)
//!     .await?;
//! match outcome {
//!     TxnOutcome::Committed { results } => { /* one result per op, in order */ }
//!     TxnOutcome::Rejected { failures } => { /* nothing was applied */ }
//! }
//! ```

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{error_from, AlderClient};
use crate::constants::{DEFAULT_REQUEST_TIMEOUT, TXN_PATH};
use crate::error::Error;
use crate::kv::{base64_bytes, Entry};

/// One operation inside a transaction.
///
/// Each verb carries only the fields it needs, so an index-guarded write
/// without an index or a session check without a session cannot be
/// expressed. On the wire an op serializes as `{"<verb>": { ...fields }}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", rename_all_fields = "PascalCase")]
pub enum TxnOp {
    /// Unconditional write.
    Set {
        key: String,
        #[serde(with = "base64_bytes")]
        value: Vec<u8>,
        #[serde(default, skip_serializing_if = "flags_unset")]
        flags: u64,
    },
    /// Write only if the entry's modify index equals `index`; 0 means the
    /// key must not exist yet.
    Cas {
        key: String,
        #[serde(with = "base64_bytes")]
        value: Vec<u8>,
        index: u64,
        #[serde(default, skip_serializing_if = "flags_unset")]
        flags: u64,
    },
    /// Read the entry; the batch fails if the key does not exist.
    Get { key: String },
    /// Assert the entry's modify index equals `index` without touching it.
    CheckIndex { key: String, index: u64 },
    /// Assert the entry is currently held by `session_owner`.
    CheckSession { key: String, session_owner: String },
    /// Unconditional delete.
    Delete { key: String },
    /// Delete only if the entry's modify index equals `index`.
    DeleteCas { key: String, index: u64 },
    /// Delete every key under the prefix in `key`.
    DeleteTree { key: String },
    /// Acquire the entry for `session_owner`, writing `value`.
    Lock {
        key: String,
        #[serde(with = "base64_bytes")]
        value: Vec<u8>,
        session_owner: String,
    },
    /// Release the entry held by `session_owner`, writing `value`.
    Unlock {
        key: String,
        #[serde(with = "base64_bytes")]
        value: Vec<u8>,
        session_owner: String,
    },
}

fn flags_unset(flags: &u64) -> bool {
    *flags == 0
}

/// Ordered batch of operations, applied atomically by the store.
///
/// Append operations with the verb methods, then [`commit`](Self::commit).
/// The batch holds plain data until committed; building one performs no
/// network traffic.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    ops: Vec<TxnOp>,
}

impl Transaction {
    /// Start an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unconditional write.
    pub fn set(self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.op(TxnOp::Set {
            key: key.into(),
            value: value.into(),
            flags: 0,
        })
    }

    /// Append an unconditional write tagged with `flags`.
    pub fn set_with_flags(
        self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        flags: u64,
    ) -> Self {
        self.op(TxnOp::Set {
            key: key.into(),
            value: value.into(),
            flags,
        })
    }

    /// Append an index-guarded write; `index` 0 means create-if-absent.
    pub fn cas(self, key: impl Into<String>, value: impl Into<Vec<u8>>, index: u64) -> Self {
        self.op(TxnOp::Cas {
            key: key.into(),
            value: value.into(),
            index,
            flags: 0,
        })
    }

    /// Append a read of `key`; the batch fails if the key does not exist.
    pub fn get(self, key: impl Into<String>) -> Self {
        self.op(TxnOp::Get { key: key.into() })
    }

    /// Append an assertion that `key`'s modify index equals `index`.
    pub fn check_index(self, key: impl Into<String>, index: u64) -> Self {
        self.op(TxnOp::CheckIndex {
            key: key.into(),
            index,
        })
    }

    /// Append an assertion that `key` is held by `session_owner`.
    pub fn check_session(self, key: impl Into<String>, session_owner: impl Into<String>) -> Self {
        self.op(TxnOp::CheckSession {
            key: key.into(),
            session_owner: session_owner.into(),
        })
    }

    /// Append an unconditional delete.
    pub fn delete(self, key: impl Into<String>) -> Self {
        self.op(TxnOp::Delete { key: key.into() })
    }

    /// Append an index-guarded delete.
    pub fn delete_cas(self, key: impl Into<String>, index: u64) -> Self {
        self.op(TxnOp::DeleteCas {
            key: key.into(),
            index,
        })
    }

    /// Append a delete of every key under `prefix`.
    pub fn delete_tree(self, prefix: impl Into<String>) -> Self {
        self.op(TxnOp::DeleteTree { key: prefix.into() })
    }

    /// Append a lock acquisition for `session_owner`, writing `value`.
    pub fn lock(
        self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        session_owner: impl Into<String>,
    ) -> Self {
        self.op(TxnOp::Lock {
            key: key.into(),
            value: value.into(),
            session_owner: session_owner.into(),
        })
    }

    /// Append a lock release by `session_owner`, writing `value`.
    pub fn unlock(
        self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        session_owner: impl Into<String>,
    ) -> Self {
        self.op(TxnOp::Unlock {
            key: key.into(),
            value: value.into(),
            session_owner: session_owner.into(),
        })
    }

    /// Append an already-built op.
    pub fn op(mut self, op: TxnOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when nothing has been queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The queued ops in submission order, for callers that submit through
    /// their own channel.
    pub fn into_ops(self) -> Vec<TxnOp> {
        self.ops
    }

    /// Submit the batch as one atomic unit.
    ///
    /// [`TxnOutcome::Rejected`] is a normal outcome: a precondition did not
    /// hold and the store applied nothing. Transport and operational
    /// failures surface as [`Error`] instead and leave the batch's
    /// application state unknown to the caller.
    pub async fn commit(self, client: &AlderClient) -> Result<TxnOutcome, Error> {
        let op_count = self.ops.len();
        let resp = client
            .send_json(Method::PUT, TXN_PATH, &self.ops, DEFAULT_REQUEST_TIMEOUT)
            .await?;
        let status = resp.status();
        match status {
            StatusCode::OK => {
                let body: TxnResultBody = serde_json::from_slice(&resp.bytes().await?)?;
                debug!(op_count, "transaction committed");
                Ok(TxnOutcome::Committed {
                    results: body.results,
                })
            }
            StatusCode::CONFLICT => {
                let body: TxnResultBody = serde_json::from_slice(&resp.bytes().await?)?;
                debug!(
                    op_count,
                    failures = body.failures.len(),
                    "transaction rejected"
                );
                Ok(TxnOutcome::Rejected {
                    failures: body.failures,
                })
            }
            _ => {
                warn!(status = status.as_u16(), op_count, "transaction submit failed");
                Err(error_from(resp).await)
            }
        }
    }
}

/// Terminal state of a submitted transaction.
///
/// The variants are mutually exclusive by construction: a committed batch
/// carries exactly one result per submitted op, in submission order, and a
/// rejected batch carries only the precondition misses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnOutcome {
    /// Every operation applied, atomically.
    Committed {
        /// One result per submitted op, in submission order.
        results: Vec<TxnOpResult>,
    },
    /// At least one precondition failed; the store applied nothing.
    Rejected {
        /// Every precondition miss, keyed by position in the batch.
        failures: Vec<TxnFailure>,
    },
}

impl TxnOutcome {
    /// True for the fully-applied case.
    pub fn is_committed(&self) -> bool {
        matches!(self, TxnOutcome::Committed { .. })
    }
}

/// Result of one operation inside a committed transaction.
///
/// Verbs that produce an entry (reads, writes, lock handoffs) carry it;
/// deletes and checks carry nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnOpResult {
    /// Entry state after the operation, when the verb produces one.
    #[serde(rename = "Entry", default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<Entry>,
}

/// One precondition miss inside a rejected transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnFailure {
    /// Position of the offending op in the submitted sequence.
    #[serde(rename = "OpIndex")]
    pub op_index: usize,
    /// Store-provided reason text.
    #[serde(rename = "Reason")]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
struct TxnResultBody {
    #[serde(rename = "Results", default)]
    results: Vec<TxnOpResult>,
    #[serde(rename = "Failures", default)]
    failures: Vec<TxnFailure>,
}
