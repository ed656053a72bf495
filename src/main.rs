use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use ruseval::{
    api,
    config::{EvaluatorConfig, generate_secret, parse_origins},
    error::Result,
    orchestrator::Orchestrator,
    runner::RunnerConfig,
    task::families,
};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "ruseval", version, about = "Dispatches tasks to a producer and grades its deployments")]
struct Cli {
    /// Where the HTTP API will listen.
    #[arg(long, default_value = "0.0.0.0:8002")]
    listen: SocketAddr,

    /// Producer endpoint task requests are posted to.
    #[arg(long, env = "STUDENT_API_ENDPOINT")]
    producer_endpoint: String,

    /// Secret included in every task request. Generated when unset.
    #[arg(long, env = "SHARED_SECRET")]
    shared_secret: Option<String>,

    /// Callback URL the producer notifies.
    #[arg(long, env = "EVALUATION_URL", default_value = "http://127.0.0.1:8000/notify")]
    evaluation_url: String,

    /// Comma separated CORS origins.
    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "*")]
    allowed_origins: String,

    /// WebDriver endpoint handed to the check runner.
    #[arg(long, env = "WEBDRIVER_URL")]
    webdriver_url: Option<String>,

    /// Check runner executable.
    #[arg(long, env = "CHECK_RUNNER")]
    check_runner: Option<PathBuf>,

    /// Seconds before a check run is killed.
    #[arg(long, default_value_t = 120)]
    runner_timeout_seconds: u64,

    /// Seconds to wait for the producer to answer a dispatch.
    #[arg(long, default_value_t = 15)]
    dispatch_timeout_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let shared_secret = cli.shared_secret.unwrap_or_else(|| {
        warn!("SHARED_SECRET not set, generated a random secret for this run");
        generate_secret()
    });

    let mut runner = RunnerConfig {
        run_timeout: Duration::from_secs(cli.runner_timeout_seconds),
        webdriver_url: cli.webdriver_url,
        ..Default::default()
    };
    if let Some(program) = cli.check_runner {
        runner.program = program;
    }

    let config = EvaluatorConfig {
        producer_endpoint: cli.producer_endpoint,
        shared_secret,
        evaluation_url: cli.evaluation_url,
        dispatch_timeout: Duration::from_secs(cli.dispatch_timeout_seconds),
        allowed_origins: parse_origins(&cli.allowed_origins),
        runner,
        ..Default::default()
    };

    info!("Producer endpoint: {}", config.producer_endpoint);
    info!("Own evaluation URL: {}", config.evaluation_url);
    info!("Check runner: {}", config.runner.program.display());
    for (family, rounds) in families() {
        info!("Task family {} with rounds {:?}", family, rounds);
    }

    let orchestrator = Arc::new(Orchestrator::new(config));
    let app = api::router(orchestrator);

    info!("listening on http://{}", cli.listen);
    axum::serve(tokio::net::TcpListener::bind(cli.listen).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown requested");
}
