use anyhow::{Context, Result};
use clap::Parser;
use reelwatch_app::{PasteReporter, RunPlan, log_config, run};
use reelwatch_common::observability::init_logging;
use reelwatch_config::{ReelwatchConfig, ReelwatchConfigLoader};
use reelwatch_social::facebook::ReelClient;
use std::path::PathBuf;

const DEFAULT_CONFIG_FILE: &str = "reelwatch.yaml";

/// Scrape a Facebook reel description and post it to a paste endpoint.
#[derive(Debug, Parser)]
#[command(name = "reelwatch", version, about)]
struct Cli {
    /// Config file; without it `reelwatch.yaml` is used when present.
    #[arg(short, long, env = "REELWATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins over file, file over defaults)
    let loader = match &cli.config {
        Some(path) => ReelwatchConfigLoader::new().with_file(path),
        None => ReelwatchConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let cfg: ReelwatchConfig = loader.load().context("failed to load configuration")?;

    // 2) Logging
    if let Some(path) = init_logging(log_config(&cfg.logging))? {
        tracing::debug!(log_file = %path.display(), "logging to file");
    }

    // 3) Clients
    let source = ReelClient::new(&cfg.target.url, cfg.target.bypass)
        .context("failed to build page client")?;
    let reporter = PasteReporter::from_config(&cfg.report).context("failed to build reporter")?;
    tracing::info!(
        target_url = %source.page_url(),
        endpoint = %reporter.endpoint(),
        "reelwatch starting"
    );

    // 4) One run; any failure ends the process with a non-zero status
    match run(&source, &reporter, &RunPlan::from(&cfg)).await {
        Ok(description) => {
            tracing::info!(%description, "scrapping done");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "reelwatch failed");
            Err(e.into())
        }
    }
}
