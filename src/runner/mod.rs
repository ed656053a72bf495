pub mod handoff;
pub mod process;

use async_trait::async_trait;

pub use handoff::RunRequest;
pub use process::{ProcessRunner, RunnerConfig};

use crate::{check::CheckResult, error::Result};

/// Executes a batch of checks somewhere isolated from the caller.
#[async_trait]
pub trait CheckRunner: Send + Sync {
    async fn run(&self, request: &RunRequest) -> Result<Vec<CheckResult>>;
}

/// Turns a runner outcome into exactly one result per requested check.
///
/// Errors and results that do not line up with `checks` become a uniform
/// failed batch.
pub fn reconcile(checks: &[String], outcome: Result<Vec<CheckResult>>) -> Vec<CheckResult> {
    match outcome {
        Ok(results)
            if results.len() == checks.len()
                && results.iter().zip(checks).all(|(r, c)| &r.check == c) =>
        {
            results
        }
        Ok(results) => CheckResult::failed_batch(
            checks,
            &format!(
                "Runner error: malformed runner output: expected {} results, got {}",
                checks.len(),
                results.len()
            ),
        ),
        Err(e) => CheckResult::failed_batch(checks, &format!("Runner error: {e}")),
    }
}
