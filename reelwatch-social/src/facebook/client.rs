//! Fetches a public Facebook reel page with the reelwatch defaults.
//!
//! Facebook serves reels behind an edge that challenges non-browser clients,
//! so the client presents a desktop browser profile unless told otherwise.
use reelwatch_http::{BrowserProfile, HttpClient, HttpError, RawResponse, RequestOpts};
use std::time::Duration;

#[derive(Clone)]
pub struct ReelClient {
    http: HttpClient,
    page_url: String,
}

impl ReelClient {
    /// Build a client for `page_url`; `bypass` installs a random desktop
    /// browser profile.
    pub fn new(page_url: impl Into<String>, bypass: bool) -> Result<Self, HttpError> {
        let mut http = HttpClient::new()?;
        if bypass {
            http = http.with_browser_profile(BrowserProfile::pick());
        }
        Ok(Self::with_http(http, page_url))
    }

    pub fn with_http(http: HttpClient, page_url: impl Into<String>) -> Self {
        Self {
            http,
            page_url: page_url.into(),
        }
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// Download the reel page; the status code is left for the caller to judge.
    pub async fn fetch(&self, deadline: Duration) -> Result<RawResponse, HttpError> {
        tracing::info!(url = %self.page_url, deadline_secs = deadline.as_secs(), "reel.fetch.start");
        let resp = self
            .http
            .get_raw(&self.page_url, deadline, RequestOpts::default())
            .await?;
        tracing::info!(
            status = resp.status.as_u16(),
            encoding = resp.encoding.as_str(),
            body_len = resp.body.len(),
            "reel.fetch.done"
        );
        Ok(resp)
    }
}
