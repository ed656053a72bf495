use std::{path::PathBuf, process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::{process::Command, time::timeout};
use tracing::{debug, error};

use crate::{
    check::CheckResult,
    error::{Result, eval_error::EvalError},
    runner::{CheckRunner, handoff::RunRequest},
};

/// Environment variable the runner process reads its WebDriver endpoint from.
pub const WEBDRIVER_URL_ENV: &str = "WEBDRIVER_URL";

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Executable to spawn; the handoff file path is appended as its last argument.
    pub program: PathBuf,
    pub args: Vec<String>,
    pub run_timeout: Duration,
    pub webdriver_url: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: default_runner_program(),
            args: Vec::new(),
            run_timeout: Duration::from_secs(120),
            webdriver_url: None,
        }
    }
}

/// `check-runner` next to the current executable, or on `PATH` as a fallback.
pub fn default_runner_program() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("check-runner")))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from("check-runner"))
}

/// Runs checks in a child process so browser faults stay out of the evaluator.
pub struct ProcessRunner {
    config: RunnerConfig,
}

impl ProcessRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CheckRunner for ProcessRunner {
    async fn run(&self, request: &RunRequest) -> Result<Vec<CheckResult>> {
        let handoff = request.write_temp()?;

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg(handoff.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(url) = &self.config.webdriver_url {
            command.env(WEBDRIVER_URL_ENV, url);
        }

        debug!(
            "spawning runner {} for {}",
            self.config.program.display(),
            request.pages_url
        );
        let child = command.spawn().map_err(|e| EvalError::RunnerFailed {
            status: "spawn failure".to_string(),
            stderr: e.to_string(),
        })?;

        let output = match timeout(self.config.run_timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                error!("runner timed out after {:?}", self.config.run_timeout);
                return Err(EvalError::RunnerTimeout(self.config.run_timeout).into());
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(EvalError::RunnerFailed {
                status: output.status.to_string(),
                stderr: if stderr.is_empty() {
                    "Unknown error in runner subprocess".to_string()
                } else {
                    stderr
                },
            }
            .into());
        }

        let results: Vec<CheckResult> = serde_json::from_slice(&output.stdout).map_err(|e| {
            error!(
                "failed to parse runner output: {}",
                String::from_utf8_lossy(&output.stdout)
            );
            EvalError::MalformedRunnerOutput(e.to_string())
        })?;
        Ok(results)
    }
}
