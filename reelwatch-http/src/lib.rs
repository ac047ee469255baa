//! Minimal HTTP client for page fetches and paste uploads, with safe logging.
//!
//! - [`HttpClient::get_raw`]: GET advertising `Accept-Encoding: gzip`,
//!   optional browser profile headers, explicit gzip decompression
//! - [`HttpClient::post_raw`]: POST of an opaque byte payload with a caller
//!   chosen `Content-Type`; non-2xx answers become [`HttpError::Api`]
//! - Every call takes an explicit deadline; expiry drops the in-flight
//!   request and yields [`HttpError::Timeout`]
//! - Optional *raw* request/response logging via `REELWATCH_HTTP_RAW=1`
//!
//! Nothing is retried. A failed request is reported to the caller as is.
//!
//! Example (no_run):
//! ```no_run
//! # async fn demo() -> Result<(), reelwatch_http::HttpError> {
//! use std::time::Duration;
//!
//! let client = reelwatch_http::HttpClient::new()?;
//! let page = client
//!     .get_raw(
//!         "https://example.com/",
//!         Duration::from_secs(30),
//!         reelwatch_http::RequestOpts::default(),
//!     )
//!     .await?;
//! println!("{} {}", page.status, page.text());
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), final errors, and (optionally)
//! raw request/response lines (target `http.raw`) when `REELWATCH_HTTP_RAW=1`.

pub mod bypass;
pub mod decode;

use bytes::Bytes;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Url};
use std::borrow::Cow;
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;

pub use bypass::BrowserProfile;
pub use decode::ContentEncoding;
pub use reqwest::StatusCode;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "REELWATCH_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)
const SNIPPET_MAX: usize = 500;

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    if let Some(bytes) = body {
        if let Ok(s) = std::str::from_utf8(bytes) {
            let mut s = s.to_string();
            if s.len() > RAW_MAX_BODY {
                truncate_on_char(&mut s, RAW_MAX_BODY);
                s.push('…');
            }
            parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
        } else {
            parts.push(format!("--data-binary @- # ({} bytes)", bytes.len()));
        }
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

/// Redact sensitive headers for logging.
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("authorization") || key.eq_ignore_ascii_case("cookie") {
                val = "<redacted>".into();
            }
            (key, val)
        })
        .collect()
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
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("failed to decompress response body: {0}")]
    Decompress(String),
    #[error("deadline of {0:?} exceeded")]
    Timeout(Duration),
    #[error("unexpected status code: {status}, body_snippet: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// Status code carried by [`HttpError::Api`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_builder() {
            Self::Build(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

// ==============================
// Request options & responses
// ==============================

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use reelwatch_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(60)),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 60);
/// assert!(opts.headers.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    /// Transport timeout handed to `reqwest`; falls back to the client default.
    pub timeout: Option<Duration>,
    pub headers: Option<HeaderMap>,
}

/// A fully read, decoded response.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    /// Encoding the server declared; `body` has already been decoded.
    pub encoding: ContentEncoding,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    /// Body as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    pub default_timeout: Duration,
    profile: Option<BrowserProfile>,
}

impl HttpClient {
    /// Construct a client without a browser profile.
    ///
    /// ```no_run
    /// use reelwatch_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new()?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(60));
    /// assert!(client.browser_profile().is_none());
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new() -> Result<Self, HttpError> {
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            inner,
            default_timeout: Duration::from_secs(60),
            profile: None,
        })
    }

    /// Override the transport timeout used when [`RequestOpts::timeout`] is unset.
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Send the given browser profile headers with every request.
    pub fn with_browser_profile(mut self, profile: BrowserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn browser_profile(&self) -> Option<&BrowserProfile> {
        self.profile.as_ref()
    }

    /// GET `url`, advertising gzip and decoding it when the server uses it.
    ///
    /// Any status code is returned as is; judging it is up to the caller.
    pub async fn get_raw(
        &self,
        url: &str,
        deadline: Duration,
        opts: RequestOpts,
    ) -> Result<RawResponse, HttpError> {
        let mut headers = opts.headers.clone().unwrap_or_default();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        let opts = RequestOpts {
            headers: Some(headers),
            ..opts
        };

        let resp = self.send(Method::GET, url, None, deadline, opts).await?;
        let body = decode::decode_body(&resp.encoding, resp.body).map_err(|e| {
            tracing::warn!(encoding = resp.encoding.as_str(), error = %e, "http.decompress_error");
            e
        })?;
        Ok(RawResponse { body, ..resp })
    }

    /// POST an opaque payload; anything but a 2xx answer is an error.
    pub async fn post_raw(
        &self,
        url: &str,
        body: Bytes,
        content_type: &str,
        deadline: Duration,
        opts: RequestOpts,
    ) -> Result<RawResponse, HttpError> {
        let mut headers = opts.headers.clone().unwrap_or_default();
        let ct = HeaderValue::from_str(content_type)
            .map_err(|e| HttpError::Build(format!("invalid Content-Type header: {e}")))?;
        headers.insert(CONTENT_TYPE, ct);
        let opts = RequestOpts {
            headers: Some(headers),
            ..opts
        };

        let resp = self
            .send(Method::POST, url, Some(body), deadline, opts)
            .await?;

        if resp.status.is_success() {
            return Ok(resp);
        }

        let request_id = request_id_of(&resp.headers);
        let message = snip_body(&resp.body);
        tracing::warn!(
            status = %resp.status,
            message = %message,
            x_request_id = %request_id,
            "http.error"
        );
        Err(HttpError::Api {
            status: resp.status,
            message,
            request_id,
        })
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
        deadline: Duration,
        opts: RequestOpts,
    ) -> Result<RawResponse, HttpError> {
        let url = Url::parse(url).map_err(|e| HttpError::Url(e.to_string()))?;
        match tokio::time::timeout(deadline, self.exchange(method, url, body, opts)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(deadline_ms = deadline.as_millis() as u64, "http.deadline_exceeded");
                Err(HttpError::Timeout(deadline))
            }
        }
    }

    async fn exchange(
        &self,
        method: Method,
        url: Url,
        body: Option<Bytes>,
        opts: RequestOpts,
    ) -> Result<RawResponse, HttpError> {
        let mut headers = opts.headers.unwrap_or_default();
        if let Some(profile) = &self.profile {
            profile.apply(&mut headers);
        }
        let timeout = opts.timeout.unwrap_or(self.default_timeout);

        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .timeout(timeout)
            .headers(headers.clone());
        if let Some(b) = &body {
            rb = rb.body(b.clone());
        }

        // Lightweight request id without extra deps
        let req_id = format!(
            "r{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            timeout_ms=timeout.as_millis() as u64,
            browser_profile=self.profile.is_some(),
            body_len=body.as_ref().map(|b| b.len()).unwrap_or(0),
            "http.request.start"
        );

        if raw_enabled() {
            let curl = make_curl(&method, &url, &headers, body.as_deref());
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        // ----- Send -----
        let t0 = Instant::now();
        let resp = rb.send().await.map_err(|err| {
            let e = HttpError::from_reqwest(err, timeout);
            tracing::warn!(req_id=%req_id, error=%e, "http.network_error.send");
            e
        })?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(|err| {
            let e = if err.is_timeout() {
                HttpError::Timeout(timeout)
            } else {
                HttpError::Body(err.to_string())
            };
            tracing::warn!(req_id=%req_id, error=%e, "http.network_error.body");
            e
        })?;
        let dur_ms = t0.elapsed().as_millis() as u64;
        let encoding = ContentEncoding::from_headers(&headers);

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=bytes.len(),
            content_encoding=encoding.as_str(),
            x_request_id=%request_id_of(&headers),
            "http.response.headers"
        );

        if raw_enabled() {
            let hdrs = redact_headers(&headers);
            let truncated = bytes.len() > RAW_MAX_BODY;
            let body_snip = &bytes[..bytes.len().min(RAW_MAX_BODY)];
            let text = String::from_utf8_lossy(body_snip);
            tracing::info!(
                target:"http.raw",
                %req_id,
                status=%status,
                duration_ms=dur_ms,
                headers=?hdrs,
                body=%text,
                truncated
            );
        }

        // compressed bodies are logged after decoding by the caller, if at all
        if encoding == ContentEncoding::Identity {
            tracing::trace!(
                req_id=%req_id,
                body_snippet=%snip_body(&bytes),
                "http.response.body_snippet"
            );
        }

        Ok(RawResponse {
            status,
            encoding,
            headers,
            body: bytes,
        })
    }
}

// ==============================
// Helpers
// ==============================

fn request_id_of(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > SNIPPET_MAX {
        truncate_on_char(&mut snip, SNIPPET_MAX);
        snip.push_str("...");
    }
    snip
}

fn truncate_on_char(s: &mut String, max: usize) {
    let mut cut = max.min(s.len());
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}
