use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("test case or round not found: {family} round {round}")]
    FixtureNotFound { family: String, round: u32 },

    #[error("nonce or round mismatch for task {0}")]
    SubmissionMismatch(String),

    #[error("no submission data available to evaluate for task {0}")]
    MissingSubmission(String),

    #[error("submission for task {0} does not include a pages_url")]
    MissingPagesUrl(String),

    #[error("could not connect to producer API: {0}")]
    ProducerUnreachable(String),

    #[error("runner exited with {status}: {stderr}")]
    RunnerFailed { status: String, stderr: String },

    #[error("runner timed out after {0:?}")]
    RunnerTimeout(Duration),

    #[error("runner panicked")]
    RunnerPanicked,

    #[error("malformed runner output: {0}")]
    MalformedRunnerOutput(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("no element with id '{0}'")]
    ElementNotFound(String),
}

impl EvalError {
    /// Errors caused by the caller's input rather than by the evaluator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EvalError::TaskNotFound(_)
                | EvalError::FixtureNotFound { .. }
                | EvalError::SubmissionMismatch(_)
                | EvalError::MissingSubmission(_)
                | EvalError::MissingPagesUrl(_)
        )
    }
}
