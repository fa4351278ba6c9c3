//! Protocol constants shared between the client and its tests.

use std::time::Duration;

/// Response header carrying the store index observed by a read.
///
/// Present on every read response, including 404s for absent paths.
pub const INDEX_HEADER: &str = "x-alder-index";

/// Query parameter naming the index an index-gated read waits on.
pub const INDEX_PARAM: &str = "index";

/// Query parameter bounding how long the store may hold an index-gated
/// read, formatted as whole milliseconds with an `ms` suffix.
pub const WAIT_PARAM: &str = "wait";

/// Query parameter that widens a read to every key under the prefix.
pub const RECURSE_PARAM: &str = "recurse";

/// Query parameter carrying the expected modify index of a
/// compare-and-swap write.
pub const CAS_PARAM: &str = "cas";

/// Path prefix for entry operations; the key is appended verbatim.
pub const ENTRIES_PATH: &str = "entries/";

/// Path for atomic transaction submission.
pub const TXN_PATH: &str = "transact";

/// Timeout applied to every non-blocking request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Slack added on top of a blocking read's `max_wait` before the client
/// gives up on a response the store failed to deliver.
pub const BLOCKING_WAIT_GRACE: Duration = Duration::from_secs(2);
