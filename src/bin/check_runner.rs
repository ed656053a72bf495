//! Runs one batch of checks in a browser and prints the results as JSON.
//!
//! Usage: `check-runner [--webdriver-url URL] <handoff.json>`

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use ruseval::{
    browser::{self, SessionConfig},
    runner::RunRequest,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "check-runner", version, about = "Executes browser checks against a deployed page")]
struct Cli {
    /// JSON file with `pages_url` and `checks`.
    handoff: PathBuf,

    #[arg(long, env = "WEBDRIVER_URL")]
    webdriver_url: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the results
    fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let request = match RunRequest::read_from(&cli.handoff) {
        Ok(request) => request,
        Err(e) => {
            error!("failed to read {}: {}", cli.handoff.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut config = SessionConfig::default();
    if let Some(url) = cli.webdriver_url {
        config.webdriver_url = url;
    }

    let specs = request.resolve_specs();
    info!("running {} checks against {}", specs.len(), request.pages_url);
    let results = browser::run_checks(&request.pages_url, &specs, &config).await;

    match serde_json::to_string(&results) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("failed to encode results: {}", e);
            ExitCode::FAILURE
        }
    }
}
