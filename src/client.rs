//! HTTP transport for the Alder coordination store.
//!
//! [`AlderClient`] owns the base URL, the optional bearer token, and the
//! pooled HTTP client every operation goes through. Key-value operations
//! live in [`crate::kv`] and transactions in [`crate::txn`]; both funnel
//! into the request primitives here and share no other state.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::{
    BLOCKING_WAIT_GRACE, DEFAULT_REQUEST_TIMEOUT, INDEX_HEADER, INDEX_PARAM, WAIT_PARAM,
};
use crate::error::Error;
use crate::kv::{QueryMeta, QueryOptions};

/// Client for one Alder store.
///
/// The client holds no mutable state: no cached index, no session, no
/// background tasks. Clones share the underlying connection pool and may be
/// driven from any number of concurrent tasks.
#[derive(Clone)]
pub struct AlderClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl AlderClient {
    /// Connect to the store at `addr`, optionally authenticating every
    /// request with a bearer `token`.
    ///
    /// The scheme defaults to plain HTTP when the address carries none, and
    /// surrounding slashes are trimmed, so `"localhost:7300"` and
    /// `"http://localhost:7300/"` name the same store. No network traffic
    /// happens here; a wrong address surfaces on the first operation.
    pub fn new(addr: &str, token: Option<&str>) -> Result<Self, Error> {
        let base = normalize_addr(addr)?;
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base,
            token: token.filter(|t| !t.is_empty()).map(str::to_owned),
        })
    }

    /// Issue a request and hand back the raw response.
    ///
    /// Exactly one network exchange per call. The bearer token and the
    /// per-request timeout are attached here so every operation goes out
    /// the same way.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<Vec<u8>>,
        timeout: Duration,
    ) -> Result<Response, Error> {
        let url = self.url_for(path)?;
        let mut req = self.http.request(method, url).timeout(timeout);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.body(body);
        }
        Ok(req.send().await?)
    }

    /// Issue a request whose body is a JSON document.
    pub(crate) async fn send_json<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<Response, Error> {
        let url = self.url_for(path)?;
        let mut req = self.http.request(method, url).timeout(timeout).json(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        Ok(req.send().await?)
    }

    /// Issue a request where only a 200 with a body is acceptable.
    pub(crate) async fn invoke(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, Error> {
        let resp = self
            .send(method, path, params, body, DEFAULT_REQUEST_TIMEOUT)
            .await?;
        let status = resp.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), path, "store request failed");
            return Err(error_from(resp).await);
        }
        Ok(resp.bytes().await?.to_vec())
    }

    /// Issue a read and capture the observed store index alongside the body.
    ///
    /// The index header is parsed before the status is inspected, so a 404
    /// still advances the caller's view of the store. `None` means the path
    /// does not exist, which is not a failure; every other non-200 is.
    pub(crate) async fn query<T: DeserializeOwned>(
        &self,
        path: &str,
        mut params: Vec<(&'static str, String)>,
        options: Option<QueryOptions>,
    ) -> Result<(Option<T>, QueryMeta), Error> {
        let mut timeout = DEFAULT_REQUEST_TIMEOUT;
        if let Some(options) = options {
            if options.min_index > 0 {
                params.push((INDEX_PARAM, options.min_index.to_string()));
                debug!(path, min_index = options.min_index, "index-gated read");
            }
            if let Some(wait) = options.max_wait {
                params.push((WAIT_PARAM, format_wait(wait)));
                timeout = wait.saturating_add(BLOCKING_WAIT_GRACE);
            }
        }
        let resp = self.send(Method::GET, path, &params, None, timeout).await?;
        let meta = QueryMeta {
            index: index_from(resp.headers()),
        };
        let status = resp.status();
        if status == StatusCode::OK {
            let body = resp.bytes().await?;
            let payload = serde_json::from_slice(&body)?;
            debug!(path, index = meta.index, "read completed");
            return Ok((Some(payload), meta));
        }
        let err = error_from(resp).await;
        if err.is_not_found() {
            Ok((None, meta))
        } else {
            warn!(status = status.as_u16(), path, "store read failed");
            Err(err)
        }
    }

    fn url_for(&self, path: &str) -> Result<Url, Error> {
        self.base.join(path).map_err(|err| Error::InvalidAddress {
            reason: err.to_string(),
        })
    }
}

/// Map a non-success response to [`Error::Status`], preserving the body.
pub(crate) async fn error_from(resp: Response) -> Error {
    let status = resp.status().as_u16();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|err| format!("store response body unreadable: {err}"));
    Error::Status { status, body }
}

/// Parse the base address into a URL the entry paths can be joined onto.
fn normalize_addr(addr: &str) -> Result<Url, Error> {
    let trimmed = addr.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidAddress {
            reason: "empty address".to_owned(),
        });
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("http://{trimmed}")
    };
    // The trailing slash keeps `Url::join` from replacing the final path
    // segment of an address like `http://host/alder`.
    Url::parse(&format!("{with_scheme}/")).map_err(|err| Error::InvalidAddress {
        reason: err.to_string(),
    })
}

fn format_wait(wait: Duration) -> String {
    format!("{}ms", wait.as_millis())
}

/// Store index from the response headers, 0 when missing or malformed.
fn index_from(headers: &HeaderMap) -> u64 {
    headers
        .get(INDEX_HEADER)
        .and_then(|raw| raw.to_str().ok())
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0)
}
