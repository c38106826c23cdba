//! Minimal JSON-over-HTTP client with safe logging and bounded retries.
//!
//! - Request options: query params, query-param auth, timeout, retries
//! - Redacts sensitive query params and never logs secret values
//! - Optionally retries 429/5xx and transport errors with exponential backoff
//! - Optional *raw* request/response logging via `AIRSCOUT_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), airscout_http::HttpError> {
//! let client = airscout_http::HttpClient::new("https://api.example.com/")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", airscout_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response status, retries, and final errors. Raw lines go to target
//! `http.raw` when enabled.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;

const RAW_ENV: &str = "AIRSCOUT_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_LEN: usize = 500;

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}")]
    Api { status: StatusCode, message: String },
}

impl HttpError {
    /// Transport-level failures (connect, timeout, truncated body).
    pub fn is_network(&self) -> bool {
        matches!(self, HttpError::Network(_))
    }
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the client.
///
/// ```
/// use airscout_http::Auth;
/// use std::borrow::Cow;
///
/// let key = Auth::Query { name: "key", value: Cow::Borrowed("secret") };
/// assert!(matches!(key, Auth::Query { name: "key", .. }));
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// API key carried as a query parameter (e.g. Google `key=`).
    Query { name: &'a str, value: Cow<'a, str> },
    None,
}

/// Per-request tuning knobs.
///
/// ```
/// use airscout_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     retries: Some(0),
///     query: vec![("address", "Beijing".into())],
///     ..Default::default()
/// };
/// assert_eq!(opts.retries, Some(0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub query: Vec<(&'a str, Cow<'a, str>)>,
}

// ==============================
// Client
// ==============================

#[derive(Clone, Debug)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use airscout_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://maps.googleapis.com/maps/api/geocode/")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 0);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 0,
        })
    }

    /// Override the default per-request timeout.
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Override the default retry budget (zero by default).
    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET `path` relative to the base URL and decode the JSON body.
    ///
    /// Transport failures, 429 and 5xx responses are retried up to the retry
    /// budget; every other non-2xx status is returned as [`HttpError::Api`].
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;

        let mut query = opts.query;
        let auth_kind = match &opts.auth {
            Some(Auth::Query { name, value }) => {
                query.push((*name, value.clone()));
                "query"
            }
            Some(Auth::None) | None => "none",
        };
        let pairs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_ref())).collect();

        let call = Call {
            req_id: uuid::Uuid::new_v4().simple().to_string(),
            url: &url,
            pairs: &pairs,
            redacted: redact_pairs(&pairs),
            timeout: opts.timeout.unwrap_or(self.default_timeout),
        };
        let max_retries = opts.retries.unwrap_or(self.max_retries);

        let mut attempt = 0usize;
        loop {
            tracing::debug!(
                target: "http",
                req_id = %call.req_id,
                attempt = attempt + 1,
                max_retries,
                host_path = %format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
                query = ?call.redacted,
                timeout_ms = call.timeout.as_millis() as u64,
                auth_kind,
                "http.request.start"
            );

            let (error, hinted) = match self.attempt(&call).await {
                Outcome::Body(bytes) => return decode(&call.req_id, &bytes),
                Outcome::Fatal(err) => return Err(err),
                Outcome::Retryable { error, delay } => (error, delay),
            };
            if attempt >= max_retries {
                tracing::warn!(target: "http", req_id = %call.req_id, attempt, error = %error, "http.giving_up");
                return Err(error);
            }
            attempt += 1;
            let delay = hinted.unwrap_or_else(|| backoff(attempt));
            tracing::warn!(
                target: "http",
                req_id = %call.req_id,
                attempt,
                backoff_ms = delay.as_millis() as u64,
                error = %error,
                "http.retrying"
            );
            sleep(delay).await;
        }
    }

    async fn attempt(&self, call: &Call<'_>) -> Outcome {
        if raw_enabled() {
            tracing::debug!(target: "http.raw", req_id = %call.req_id, url = %call.url, query = ?call.redacted, "request");
        }

        let t0 = Instant::now();
        let sent = self
            .inner
            .get(call.url.clone())
            .query(call.pairs)
            .timeout(call.timeout)
            .send()
            .await;
        let resp = match sent {
            Ok(resp) => resp,
            Err(err) => return Outcome::network(err),
        };

        let status = resp.status();
        let hinted = retry_after(resp.headers());
        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => return Outcome::network(err),
        };

        tracing::debug!(
            target: "http",
            req_id = %call.req_id,
            %status,
            duration_ms = t0.elapsed().as_millis() as u64,
            body_len = bytes.len(),
            "http.response"
        );
        if raw_enabled() {
            let mut body = String::from_utf8_lossy(&bytes).to_string();
            let truncated = body.len() > RAW_MAX_BODY;
            if truncated {
                body.truncate(floor_char_boundary(&body, RAW_MAX_BODY));
            }
            tracing::info!(target: "http.raw", req_id = %call.req_id, %status, %body, truncated, "response");
        }

        if status.is_success() {
            return Outcome::Body(bytes.to_vec());
        }
        let error = HttpError::Api {
            status,
            message: extract_error_message(&bytes),
        };
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Outcome::Retryable {
                error,
                delay: hinted,
            }
        } else {
            tracing::warn!(target: "http", req_id = %call.req_id, %status, error = %error, "http.error");
            Outcome::Fatal(error)
        }
    }
}

/// Everything about one logical request that stays fixed across retries.
struct Call<'a> {
    req_id: String,
    url: &'a Url,
    pairs: &'a [(&'a str, &'a str)],
    redacted: Vec<(String, String)>,
    timeout: Duration,
}

enum Outcome {
    Body(Vec<u8>),
    Retryable {
        error: HttpError,
        delay: Option<Duration>,
    },
    Fatal(HttpError),
}

impl Outcome {
    fn network(err: reqwest::Error) -> Self {
        Outcome::Retryable {
            error: HttpError::Network(err.to_string()),
            delay: None,
        }
    }
}

fn decode<T: DeserializeOwned>(req_id: &str, bytes: &[u8]) -> Result<T, HttpError> {
    serde_json::from_slice::<T>(bytes).map_err(|e| {
        let snippet = snip_body(bytes);
        tracing::warn!(
            target: "http",
            req_id,
            serde_err = %e,
            body_snippet = %snippet,
            "http.response.decode_error"
        );
        HttpError::Decode(e.to_string(), snippet)
    })
}

// ==============================
// Helpers
// ==============================

fn backoff(attempt: usize) -> Duration {
    Duration::from_millis(200u64.saturating_mul(1 << (attempt.saturating_sub(1)).min(10)))
}

fn retry_after(h: &HeaderMap) -> Option<Duration> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .parse()
        .ok()
        .map(Duration::from_secs)
}

fn is_secret_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "apikey"
            | "token"
            | "secret"
            | "client_secret"
            | "password"
    )
}

fn redact_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| {
            let shown = if is_secret_param(k) {
                "<redacted>".to_string()
            } else {
                (*v).to_string()
            };
            ((*k).to_string(), shown)
        })
        .collect()
}

/// Pull a human readable message out of an error body.
///
/// Google style: `{"status":"REQUEST_DENIED","error_message":"..."}`;
/// generic: `{"message":"..."}` / `{"error":"..."}`.
fn extract_error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        error_message: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        error: serde_json::Value,
    }

    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        if !m.error_message.is_empty() {
            return m.error_message;
        }
        if !m.message.is_empty() {
            return m.message;
        }
        match m.error {
            serde_json::Value::String(s) if !s.is_empty() => return s,
            serde_json::Value::Object(obj) => {
                if let Some(s) = obj.get("message").and_then(|v| v.as_str()) {
                    return s.to_string();
                }
            }
            _ => {}
        }
    }
    snip_body(body)
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > SNIPPET_LEN {
        snip.truncate(floor_char_boundary(&snip, SNIPPET_LEN));
        snip.push_str("...");
    }
    snip
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_never_reach_logs() {
        let pairs = [("address", "Beijing"), ("region", "cn"), ("key", "AIza-secret")];
        let redacted = redact_pairs(&pairs);
        assert_eq!(redacted[0], ("address".into(), "Beijing".into()));
        assert_eq!(redacted[2], ("key".into(), "<redacted>".into()));
        assert!(!format!("{redacted:?}").contains("AIza-secret"));
    }

    #[test]
    fn google_error_message_is_preferred() {
        let body = br#"{"results":[],"status":"REQUEST_DENIED","error_message":"The provided API key is invalid."}"#;
        assert_eq!(extract_error_message(body), "The provided API key is invalid.");
        assert_eq!(
            extract_error_message(br#"{"error":{"message":"nested"}}"#),
            "nested"
        );
        assert_eq!(extract_error_message(b"plain text"), "plain text");
    }

    #[test]
    fn snippets_are_bounded_and_char_safe() {
        let long = "é".repeat(400);
        let snip = snip_body(long.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= SNIPPET_LEN + 3);
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_millis(200));
        assert_eq!(backoff(2), Duration::from_millis(400));
        assert_eq!(backoff(3), Duration::from_millis(800));
    }
}
