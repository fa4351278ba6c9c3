//! Key-value operations and the index-gated read model.
//!
//! Every read reports the store index it observed through [`QueryMeta`],
//! and accepts a [`QueryOptions`] qualifier that turns it into a blocking
//! query: the store holds the response until its view moves past
//! `min_index` or `max_wait` elapses. The returned index is a hint that
//! something under the path *may* have changed, never proof that it did;
//! detecting real change is the caller's job.
//!
//! # Watching a key
//!
//! Indefinite watching is an explicit caller loop over the bounded poll:
//!
//! ```rust,ignore
//! let mut last = 0;
//! loop {
//!     let options = QueryOptions::blocking(last, Duration::from_secs(60));
//!     let (entry, meta) = match client.get("infra/gateway/notify", Some(options)).await {
//!         Ok(polled) => polled,
//!         Err(err) => {
//!             // A failed poll ends the attempt, not the watch.
//!             tracing::warn!(%err, "poll failed, retrying");
//!             tokio::time::sleep(Duration::from_secs(1)).await;
//!             continue;
//!         }
//!     };
//!     if meta.index != last {
//!         last = meta.index;
//!         handle_change(entry);
//!     }
//! }
//! ```

use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::AlderClient;
use crate::constants::{CAS_PARAM, ENTRIES_PATH, RECURSE_PARAM};
use crate::error::Error;

/// One stored entry, as returned by reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entry {
    /// Slash-delimited path, unique within the store.
    pub key: String,
    /// Opaque bytes; rides the wire as base64.
    #[serde(with = "base64_bytes", default)]
    pub value: Vec<u8>,
    /// Opaque 64-bit tag set by the writer, round-tripped verbatim.
    #[serde(default)]
    pub flags: u64,
    /// Store index at which the entry was created.
    pub create_index: u64,
    /// Store index of the entry's last change. Never decreases for the
    /// life of the entry.
    pub modify_index: u64,
    /// Times the entry has been acquired as a lock.
    #[serde(default)]
    pub lock_index: u64,
    /// Session currently holding the entry, empty when unowned.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_owner: String,
}

/// `Vec<u8>` as a base64 string, with `null` and absence read as empty.
pub(crate) mod base64_bytes {
    use base64::prelude::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => BASE64_STANDARD
                .decode(encoded.as_bytes())
                .map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

/// Read qualifier for index-gated queries.
///
/// The default qualifier (`min_index` 0, no wait) answers immediately. A
/// non-zero `min_index` asks the store to hold the response until its view
/// of the queried path moves past that index or `max_wait` elapses,
/// whichever comes first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Index the store's view must move past before answering.
    pub min_index: u64,
    /// Upper bound on how long the store may hold the response.
    pub max_wait: Option<Duration>,
}

impl QueryOptions {
    /// Qualifier for one bounded blocking poll.
    pub fn blocking(min_index: u64, max_wait: Duration) -> Self {
        Self {
            min_index,
            max_wait: Some(max_wait),
        }
    }
}

/// Read metadata: the store index observed on the response.
///
/// Callers thread `index` into the next poll's
/// [`QueryOptions::min_index`]. The value is authoritative for that
/// purpose even when the payload did not change, and even when the read
/// found nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryMeta {
    /// Store index observed on this response.
    pub index: u64,
}

impl AlderClient {
    /// Read one entry. `None` means no entry at this path, which is not a
    /// failure.
    pub async fn get(
        &self,
        key: &str,
        options: Option<QueryOptions>,
    ) -> Result<(Option<Entry>, QueryMeta), Error> {
        let (entries, meta) = self
            .query::<Vec<Entry>>(&entry_path(key), Vec::new(), options)
            .await?;
        let entry = entries.unwrap_or_default().into_iter().next();
        Ok((entry, meta))
    }

    /// List every entry whose key starts with `prefix`, in store order.
    ///
    /// An empty result is not a failure, and an empty prefix matches the
    /// whole store.
    pub async fn list(
        &self,
        prefix: &str,
        options: Option<QueryOptions>,
    ) -> Result<(Vec<Entry>, QueryMeta), Error> {
        let params = vec![(RECURSE_PARAM, "true".to_owned())];
        let (entries, meta) = self
            .query::<Vec<Entry>>(&entry_path(prefix), params, options)
            .await?;
        Ok((entries.unwrap_or_default(), meta))
    }

    /// Unconditionally write `value` under `key`, creating or overwriting.
    pub async fn put(&self, key: &str, value: impl Into<Vec<u8>>) -> Result<bool, Error> {
        let raw = self
            .invoke(Method::PUT, &entry_path(key), &[], Some(value.into()))
            .await?;
        Ok(parse_committed(&raw))
    }

    /// Write `value` under `key` only if the entry's modify index still
    /// equals `expected_modify_index`. An expectation of 0 means the key
    /// must not exist yet, which makes this the create-if-absent idiom.
    ///
    /// `Ok(false)` is a missed precondition, not a failure; callers must
    /// check it explicitly and typically re-read before retrying.
    pub async fn compare_and_swap(
        &self,
        key: &str,
        value: impl Into<Vec<u8>>,
        expected_modify_index: u64,
    ) -> Result<bool, Error> {
        let params = [(CAS_PARAM, expected_modify_index.to_string())];
        let raw = self
            .invoke(Method::PUT, &entry_path(key), &params, Some(value.into()))
            .await?;
        Ok(parse_committed(&raw))
    }

    /// Remove `key`, reporting whether it existed.
    pub async fn delete(&self, key: &str) -> Result<bool, Error> {
        let raw = self
            .invoke(Method::DELETE, &entry_path(key), &[], None)
            .await?;
        Ok(parse_committed(&raw))
    }
}

fn entry_path(key: &str) -> String {
    format!("{ENTRIES_PATH}{}", key.trim_start_matches('/'))
}

/// The store answers writes with a literal `true` or `false` body.
fn parse_committed(raw: &[u8]) -> bool {
    std::str::from_utf8(raw)
        .map(|s| s.trim() == "true")
        .unwrap_or(false)
}
