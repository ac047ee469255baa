use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use reelwatch_app::{PasteReporter, PipelineError, ReportStage, Reporter, RunPlan, run};
use reelwatch_http::{HttpError, StatusCode};
use reelwatch_social::facebook::{ExtractError, ReelClient};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HELLO_PAGE: &str = r#"<html><head><meta property="og:description" content="Hello World" /></head></html>"#;

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

fn plan() -> RunPlan {
    RunPlan {
        fetch_deadline: Duration::from_secs(5),
        report_deadline: Duration::from_secs(5),
        ..RunPlan::default()
    }
}

/// Keeps every message instead of sending it anywhere.
#[derive(Default)]
struct RecordingReporter {
    messages: Mutex<Vec<String>>,
    fail_with: Option<u16>,
}

impl RecordingReporter {
    fn failing(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            ..Self::default()
        }
    }

    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn report(&self, payload: &[u8], _deadline: Duration) -> Result<(), HttpError> {
        self.messages
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(payload).into_owned());
        match self.fail_with {
            Some(code) => Err(HttpError::Api {
                status: StatusCode::from_u16(code).unwrap(),
                message: "rejected".into(),
                request_id: "-".into(),
            }),
            None => Ok(()),
        }
    }
}

async fn page_server(template: ResponseTemplate) -> (MockServer, ReelClient) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reel/1/"))
        .respond_with(template)
        .mount(&server)
        .await;
    let client = ReelClient::new(format!("{}/reel/1/", server.uri()), true).unwrap();
    (server, client)
}

#[tokio::test]
async fn success_reports_timestamped_description() {
    let (_page, source) = page_server(ResponseTemplate::new(200).set_body_string(HELLO_PAGE)).await;
    let reporter = RecordingReporter::default();

    let description = run(&source, &reporter, &plan()).await.unwrap();

    assert_eq!(description, "Hello World");
    let messages = reporter.messages();
    assert_eq!(messages.len(), 1);
    assert!(
        messages[0].ends_with(": scrapping done, description: Hello World"),
        "{}",
        messages[0]
    );
    // "YYYY-MM-DD HH:MM:SS" prefix
    assert_eq!(messages[0].find(": scrapping"), Some(19));
}

#[tokio::test]
async fn gzip_page_is_decoded_before_extraction() {
    let (_page, source) = page_server(
        ResponseTemplate::new(200)
            .insert_header("content-encoding", "gzip")
            .set_body_bytes(gzip(HELLO_PAGE.as_bytes())),
    )
    .await;
    let reporter = RecordingReporter::default();

    let description = run(&source, &reporter, &plan()).await.unwrap();
    assert_eq!(description, "Hello World");
}

#[tokio::test]
async fn bad_status_is_reported_and_extraction_skipped() {
    // The body would extract fine; a 503 must still stop the run.
    let (_page, source) = page_server(ResponseTemplate::new(503).set_body_string(HELLO_PAGE)).await;
    let reporter = RecordingReporter::default();

    let err = run(&source, &reporter, &plan()).await.unwrap_err();

    assert!(matches!(err, PipelineError::UnexpectedStatus(503)), "{err:?}");
    let messages = reporter.messages();
    assert_eq!(
        messages,
        vec!["unexpected status code while download reels: 503".to_string()]
    );
    assert!(messages[0].contains("503"));
}

#[tokio::test]
async fn missing_marker_is_reported() {
    let (_page, source) =
        page_server(ResponseTemplate::new(200).set_body_string("<html>login required</html>")).await;
    let reporter = RecordingReporter::default();

    let err = run(&source, &reporter, &plan()).await.unwrap_err();

    assert!(
        matches!(err, PipelineError::Extract(ExtractError::MissingOpen)),
        "{err:?}"
    );
    assert_eq!(
        reporter.messages(),
        vec!["unable to parse response: unable to find description".to_string()]
    );
}

#[tokio::test]
async fn fetch_deadline_is_reported_as_fetch_failure() {
    let (_page, source) =
        page_server(ResponseTemplate::new(200).set_delay(Duration::from_secs(2))).await;
    let reporter = RecordingReporter::default();
    let plan = RunPlan {
        fetch_deadline: Duration::from_millis(100),
        ..plan()
    };

    let err = run(&source, &reporter, &plan).await.unwrap_err();

    assert!(
        matches!(err, PipelineError::Fetch(HttpError::Timeout(_))),
        "{err:?}"
    );
    let messages = reporter.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("unable to get data: "), "{}", messages[0]);
}

#[tokio::test]
async fn upload_failure_takes_precedence_over_status_failure() {
    let (_page, source) = page_server(ResponseTemplate::new(503)).await;
    let reporter = RecordingReporter::failing(500);

    let err = run(&source, &reporter, &plan()).await.unwrap_err();

    match err {
        PipelineError::Upload {
            stage: ReportStage::Failure,
            source,
        } => assert_eq!(source.status(), Some(StatusCode::INTERNAL_SERVER_ERROR)),
        other => panic!("expected upload failure, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_failure_after_success_fails_the_run() {
    let (_page, source) = page_server(ResponseTemplate::new(200).set_body_string(HELLO_PAGE)).await;
    let reporter = RecordingReporter::failing(500);

    let err = run(&source, &reporter, &plan()).await.unwrap_err();
    assert!(
        matches!(
            err,
            PipelineError::Upload {
                stage: ReportStage::Description,
                ..
            }
        ),
        "{err:?}"
    );
    assert!(err.to_string().starts_with("unable to upload description to pastebin: "));
}

#[tokio::test]
async fn paste_reporter_end_to_end() {
    let (_page, source) = page_server(ResponseTemplate::new(503)).await;

    let paste = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("content-type", "application/json"))
        .and(body_string_contains("503"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&paste)
        .await;

    let reporter =
        PasteReporter::new(format!("{}/", paste.uri()), "application/json", Duration::from_secs(60))
            .unwrap();

    let err = run(&source, &reporter, &plan()).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnexpectedStatus(503)), "{err:?}");
}

#[tokio::test]
async fn paste_endpoint_500_surfaces_as_upload_error() {
    let (_page, source) = page_server(ResponseTemplate::new(200).set_body_string(HELLO_PAGE)).await;

    let paste = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("scrapping done, description: Hello World"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&paste)
        .await;

    let reporter =
        PasteReporter::new(paste.uri(), "application/json", Duration::from_secs(60)).unwrap();

    let err = run(&source, &reporter, &plan()).await.unwrap_err();
    match err {
        PipelineError::Upload {
            stage: ReportStage::Description,
            source: HttpError::Api { status, .. },
        } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR)
        }
        other => panic!("expected upload failure, got {other:?}"),
    }
}

async fn slow_paste_server() -> MockServer {
    let paste = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&paste)
        .await;
    paste
}

#[tokio::test]
async fn report_deadline_expiry_surfaces_as_upload_timeout() {
    let (_page, source) = page_server(ResponseTemplate::new(200).set_body_string(HELLO_PAGE)).await;
    let paste = slow_paste_server().await;
    let reporter =
        PasteReporter::new(paste.uri(), "application/json", Duration::from_secs(60)).unwrap();
    let deadline = Duration::from_millis(100);
    let plan = RunPlan {
        report_deadline: deadline,
        ..plan()
    };

    let err = run(&source, &reporter, &plan).await.unwrap_err();

    assert!(
        matches!(
            err,
            PipelineError::Upload {
                stage: ReportStage::Description,
                source: HttpError::Timeout(d),
            } if d == deadline
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn upload_client_timeout_applies_within_report_deadline() {
    let (_page, source) = page_server(ResponseTemplate::new(503)).await;
    let paste = slow_paste_server().await;
    let client_timeout = Duration::from_millis(100);
    let reporter = PasteReporter::new(paste.uri(), "application/json", client_timeout).unwrap();

    let err = run(&source, &reporter, &plan()).await.unwrap_err();

    assert!(
        matches!(
            err,
            PipelineError::Upload {
                stage: ReportStage::Failure,
                source: HttpError::Timeout(d),
            } if d == client_timeout
        ),
        "{err:?}"
    );
}
