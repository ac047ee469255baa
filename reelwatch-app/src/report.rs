//! Delivery of run results to the paste endpoint.
//!
//! The endpoint is a write-only sink: whatever bytes we hand it are stored
//! as is. It is told the payload is JSON even though the messages are plain
//! text, matching what the receiving side has always been sent.
use async_trait::async_trait;
use bytes::Bytes;
use reelwatch_config::ReportConfig;
use reelwatch_http::{HttpClient, HttpError, RequestOpts};
use std::time::Duration;

/// Sink for the single message a run produces.
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Deliver `payload`, giving up once `deadline` has passed.
    async fn report(&self, payload: &[u8], deadline: Duration) -> Result<(), HttpError>;
}

/// [`Reporter`] that POSTs to a paste/request-bin style endpoint.
#[derive(Clone)]
pub struct PasteReporter {
    http: HttpClient,
    endpoint: String,
    content_type: String,
}

impl PasteReporter {
    pub fn new(
        endpoint: impl Into<String>,
        content_type: impl Into<String>,
        client_timeout: Duration,
    ) -> Result<Self, HttpError> {
        let http = HttpClient::new()?.with_timeout(client_timeout);
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            content_type: content_type.into(),
        })
    }

    pub fn from_config(cfg: &ReportConfig) -> Result<Self, HttpError> {
        Self::new(&cfg.endpoint, &cfg.content_type, cfg.client_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Reporter for PasteReporter {
    async fn report(&self, payload: &[u8], deadline: Duration) -> Result<(), HttpError> {
        tracing::debug!(endpoint = %self.endpoint, bytes = payload.len(), "report.upload.start");
        let resp = self
            .http
            .post_raw(
                &self.endpoint,
                Bytes::copy_from_slice(payload),
                &self.content_type,
                deadline,
                RequestOpts::default(),
            )
            .await?;
        tracing::info!(status = resp.status.as_u16(), "report.upload.done");
        Ok(())
    }
}
