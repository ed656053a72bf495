pub mod executor;
pub mod session;
pub mod webdriver;

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

pub use executor::CheckExecutor;
pub use session::{BrowserSession, ElementState, SessionConfig};
pub use webdriver::WebDriverSession;

use crate::{
    check::{CheckResult, CheckSpec},
    error::{Result, eval_error::EvalError},
};

/// Opens a WebDriver session and runs every spec against `pages_url`.
///
/// Always returns exactly one result per spec.
pub async fn run_checks(
    pages_url: &str,
    specs: &[CheckSpec],
    config: &SessionConfig,
) -> Vec<CheckResult> {
    match WebDriverSession::connect(config).await {
        Ok(mut session) => run_session(&mut session, pages_url, specs, config).await,
        Err(e) => {
            error!("browser session setup failed: {}", e);
            setup_failure(specs, &e.to_string())
        }
    }
}

/// Navigates once, then executes the specs in order against the same page.
///
/// Each spec gets its own failure boundary. The session is closed on every
/// path, including a failed navigation.
pub async fn run_session<S>(
    session: &mut S,
    pages_url: &str,
    specs: &[CheckSpec],
    config: &SessionConfig,
) -> Vec<CheckResult>
where
    S: BrowserSession + ?Sized,
{
    let results = match open_page(session, pages_url, config).await {
        Ok(()) => execute_all(session, specs, config).await,
        Err(e) => {
            error!("failed to load {}: {}", pages_url, e);
            setup_failure(specs, &e.to_string())
        }
    };

    if let Err(e) = session.close().await {
        warn!("failed to close browser session: {}", e);
    }

    results
}

pub fn setup_failure(specs: &[CheckSpec], reason: &str) -> Vec<CheckResult> {
    let labels: Vec<&str> = specs.iter().map(|s| s.label()).collect();
    CheckResult::failed_batch(&labels, &format!("Browser session error: {reason}"))
}

async fn open_page<S>(session: &mut S, pages_url: &str, config: &SessionConfig) -> Result<()>
where
    S: BrowserSession + ?Sized,
{
    info!("navigating to {}", pages_url);
    timeout(config.page_load_timeout, session.goto(pages_url))
        .await
        .map_err(|_| {
            EvalError::Browser(format!(
                "page load timed out after {:?}",
                config.page_load_timeout
            ))
        })??;
    sleep(config.settle_delay).await;
    Ok(())
}

async fn execute_all<S>(session: &mut S, specs: &[CheckSpec], config: &SessionConfig) -> Vec<CheckResult>
where
    S: BrowserSession + ?Sized,
{
    let executor = CheckExecutor::new(config);
    let mut results = Vec::with_capacity(specs.len());

    for spec in specs {
        let guarded = timeout(config.check_timeout, executor.execute(&mut *session, spec));
        let result = match AssertUnwindSafe(guarded).catch_unwind().await {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(e))) => CheckResult::fail(spec.label(), format!("Check failed: {e}")),
            Ok(Err(_)) => CheckResult::fail(
                spec.label(),
                format!("Check failed: timed out after {:?}", config.check_timeout),
            ),
            Err(_) => CheckResult::fail(spec.label(), "Check failed: check panicked"),
        };

        if !result.passed {
            warn!("check failed: {} ({})", result.check, result.details);
        }
        results.push(result);
    }

    results
}
