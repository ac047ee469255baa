//! One scrape run: fetch the reel page, cut out the description, report.
//!
//! Fetch → (transport failure or non-200) → report failure → stop
//!       → extract → (markers missing) → report failure → stop
//!       → report description → done
//!
//! Every failure is forwarded to the [`Reporter`] before the run ends. When
//! that upload fails too, the upload error is what the run returns.
use chrono::{DateTime, Local};
use reelwatch_config::ReelwatchConfig;
use reelwatch_http::HttpError;
use reelwatch_http::StatusCode;
use reelwatch_social::facebook::{ExtractError, Markers, ReelClient, extract_between};
use std::time::Duration;
use thiserror::Error;

use crate::report::Reporter;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unable to get data: {0}")]
    Fetch(HttpError),
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),
    #[error("unable to parse response: {0}")]
    Extract(#[from] ExtractError),
    #[error("{}: {source}", .stage.context())]
    Upload {
        stage: ReportStage,
        #[source]
        source: HttpError,
    },
}

/// Which message a failed upload was carrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStage {
    /// A fetch, status or extraction failure.
    Failure,
    /// The extracted description.
    Description,
}

impl ReportStage {
    fn context(&self) -> &'static str {
        match self {
            Self::Failure => "unable to upload to pastebin",
            Self::Description => "unable to upload description to pastebin",
        }
    }
}

/// Deadlines and markers for a run, lifted out of the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub fetch_deadline: Duration,
    pub report_deadline: Duration,
    pub open_marker: String,
    pub close_marker: String,
}

impl RunPlan {
    pub fn markers(&self) -> Markers<'_> {
        Markers {
            open: &self.open_marker,
            close: &self.close_marker,
        }
    }
}

impl Default for RunPlan {
    fn default() -> Self {
        Self::from(&ReelwatchConfig::default())
    }
}

impl From<&ReelwatchConfig> for RunPlan {
    fn from(cfg: &ReelwatchConfig) -> Self {
        Self {
            fetch_deadline: cfg.target.fetch_timeout(),
            report_deadline: cfg.report.deadline(),
            open_marker: cfg.target.markers.open.clone(),
            close_marker: cfg.target.markers.close.clone(),
        }
    }
}

/// Run the scrape once and return the extracted description.
pub async fn run(
    source: &ReelClient,
    reporter: &dyn Reporter,
    plan: &RunPlan,
) -> Result<String, PipelineError> {
    let page = match source.fetch(plan.fetch_deadline).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!(error = %e, "pipeline.fetch_failed");
            deliver(reporter, &fetch_failure_message(&e), ReportStage::Failure, plan).await?;
            return Err(PipelineError::Fetch(e));
        }
    };

    if page.status != StatusCode::OK {
        let code = page.status.as_u16();
        tracing::warn!(status = code, "pipeline.unexpected_status");
        deliver(reporter, &status_message(code), ReportStage::Failure, plan).await?;
        return Err(PipelineError::UnexpectedStatus(code));
    }

    let text = page.text();
    let description = match extract_between(&text, &plan.markers()) {
        Ok(found) => found.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, body_len = text.len(), "pipeline.extract_failed");
            deliver(reporter, &parse_failure_message(e), ReportStage::Failure, plan).await?;
            return Err(PipelineError::Extract(e));
        }
    };

    deliver(
        reporter,
        &success_message(&description, Local::now()),
        ReportStage::Description,
        plan,
    )
    .await?;
    Ok(description)
}

async fn deliver(
    reporter: &dyn Reporter,
    message: &str,
    stage: ReportStage,
    plan: &RunPlan,
) -> Result<(), PipelineError> {
    reporter
        .report(message.as_bytes(), plan.report_deadline)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, ?stage, "pipeline.report_failed");
            PipelineError::Upload { stage, source: e }
        })
}

pub fn fetch_failure_message(err: &HttpError) -> String {
    format!("unable to get data: {err}")
}

pub fn status_message(code: u16) -> String {
    format!("unexpected status code while download reels: {code}")
}

pub fn parse_failure_message(err: ExtractError) -> String {
    format!("unable to parse response: {err}")
}

/// `2024-05-01 13:37:00: scrapping done, description: …`
pub fn success_message(description: &str, at: DateTime<Local>) -> String {
    format!(
        "{}: scrapping done, description: {description}",
        at.format("%Y-%m-%d %H:%M:%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn success_message_has_timestamp_prefix() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 13, 37, 0).unwrap();
        assert_eq!(
            success_message("Hello World", at),
            "2024-05-01 13:37:00: scrapping done, description: Hello World"
        );
    }

    #[test]
    fn failure_messages() {
        assert_eq!(
            status_message(503),
            "unexpected status code while download reels: 503"
        );
        assert_eq!(
            parse_failure_message(ExtractError::MissingClose),
            "unable to parse response: unable to find end of description"
        );
        assert_eq!(
            fetch_failure_message(&HttpError::Network("connection refused".into())),
            "unable to get data: network error: connection refused"
        );
    }

    #[test]
    fn upload_errors_name_the_message_they_carried() {
        let failed = |stage| PipelineError::Upload {
            stage,
            source: HttpError::Network("connection reset".into()),
        };
        assert_eq!(
            failed(ReportStage::Failure).to_string(),
            "unable to upload to pastebin: network error: connection reset"
        );
        assert_eq!(
            failed(ReportStage::Description).to_string(),
            "unable to upload description to pastebin: network error: connection reset"
        );
    }

    #[test]
    fn plan_follows_config() {
        let mut cfg = ReelwatchConfig::default();
        cfg.target.fetch_timeout_secs = 7;
        cfg.report.deadline_secs = 9;
        cfg.target.markers.open = "<x>".into();
        let plan = RunPlan::from(&cfg);
        assert_eq!(plan.fetch_deadline, Duration::from_secs(7));
        assert_eq!(plan.report_deadline, Duration::from_secs(9));
        assert_eq!(plan.markers().open, "<x>");
        assert_eq!(plan.markers().close, r#"" />"#);
    }

    #[test]
    fn default_plan_uses_og_description() {
        let plan = RunPlan::default();
        assert_eq!(plan.markers(), Markers::OG_DESCRIPTION);
        assert_eq!(plan.fetch_deadline, Duration::from_secs(30));
        assert_eq!(plan.report_deadline, Duration::from_secs(30));
    }
}
