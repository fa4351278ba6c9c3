//! Client for the Alder coordination store.
//!
//! Alder is a hierarchical key-value store with the consistency contract
//! of a coordination service: every entry carries the store index at which
//! it was created and last modified, every read reports the index it
//! observed, and reads can be index-qualified so the store holds the
//! response until something under the path may have changed. This crate is
//! the client side only. It speaks the store's HTTP protocol and adds no
//! caching, no retries, and no background machinery; state lives in the
//! store, not in the handle.
//!
//! # Key Components
//!
//! - [`AlderClient`]: transport handle; get, list, put, delete, and
//!   compare-and-swap against single keys
//! - [`QueryOptions`] / [`QueryMeta`]: the blocking-query qualifier and
//!   the observed-index half of every read
//! - [`Transaction`]: ordered multi-key batches over [`TxnOp`], applied
//!   atomically and resolved into a [`TxnOutcome`]
//! - [`Error`]: operational and transport failures; absence and missed
//!   preconditions are reported as data, never through [`Error`]
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use alder_client::{AlderClient, QueryOptions};
//!
//! let client = AlderClient::new("localhost:7300", None)?;
//!
//! client.put("infra/gateway/upstreams", b"10.0.0.7:443".to_vec()).await?;
//! let (entry, meta) = client.get("infra/gateway/upstreams", None).await?;
//! assert!(entry.is_some());
//!
//! // Hold the next read until the store moves past `meta.index`, up to 30s.
//! let options = QueryOptions::blocking(meta.index, Duration::from_secs(30));
//! let (entry, meta) = client.get("infra/gateway/upstreams", Some(options)).await?;
//! ```

pub mod constants;

mod client;
mod error;
mod kv;
mod txn;

pub use client::AlderClient;
pub use error::Error;
pub use kv::{Entry, QueryMeta, QueryOptions};
pub use txn::{Transaction, TxnFailure, TxnOp, TxnOpResult, TxnOutcome};
