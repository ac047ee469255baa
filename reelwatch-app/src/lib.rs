//! The reelwatch run: fetch a reel page, extract its description and post
//! the outcome to a paste endpoint.
//!
//! The binary in `main.rs` only wires configuration, logging and the two
//! clients together; everything observable lives in [`pipeline`] and
//! [`report`].
use reelwatch_common::observability::{LogConfig, LogFormat};
use reelwatch_config::LoggingConfig;
use std::path::PathBuf;

pub mod pipeline;
pub mod report;

pub use pipeline::{PipelineError, ReportStage, RunPlan, run};
pub use report::{PasteReporter, Reporter};

/// Translate the `logging` section into the shared observability settings.
pub fn log_config(cfg: &LoggingConfig) -> LogConfig {
    LogConfig {
        app_name: "reelwatch",
        log_dir: cfg.dir.as_ref().map(PathBuf::from),
        emit_stderr: cfg.emit_stderr,
        format: match cfg.format {
            reelwatch_config::LogFormat::Text => LogFormat::Text,
            reelwatch_config::LogFormat::Json => LogFormat::Json,
        },
        default_filter: cfg.filter.clone(),
    }
}
