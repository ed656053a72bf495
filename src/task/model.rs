use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::check::{CheckResult, CheckSpec, interpret_all};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    /// Data URI, e.g. `data:text/csv;base64,...`.
    pub content: String,
}

/// Payload posted to the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub email: String,
    pub secret: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub brief: String,
    pub checks: Vec<String>,
    pub evaluation_url: String,
    pub attachments: Vec<Attachment>,
}

/// Body of the producer's notification once a deployment is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Pending,
    Sent,
    FailedToSend,
    Evaluating,
    #[serde(rename = "re-evaluating")]
    ReEvaluating,
    Completed,
}

impl EvaluationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EvaluationStatus::Completed | EvaluationStatus::FailedToSend)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, EvaluationStatus::Evaluating | EvaluationStatus::ReEvaluating)
    }
}

impl Default for EvaluationStatus {
    fn default() -> Self {
        EvaluationStatus::Pending
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationStatus::Pending => write!(f, "pending"),
            EvaluationStatus::Sent => write!(f, "sent"),
            EvaluationStatus::FailedToSend => write!(f, "failed_to_send"),
            EvaluationStatus::Evaluating => write!(f, "evaluating"),
            EvaluationStatus::ReEvaluating => write!(f, "re-evaluating"),
            EvaluationStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub status: EvaluationStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub submission_data: Option<Submission>,
    pub evaluation_completed_at: Option<DateTime<Utc>>,
    pub check_results: Vec<CheckResult>,
    /// Run whose completion this record is waiting for; 0 before the first run.
    pub generation: u64,
}

impl EvaluationRecord {
    /// Resets the record for a new run. Keeps the previous submission when
    /// `submission` is `None`.
    pub fn begin(&mut self, status: EvaluationStatus, generation: u64, submission: Option<Submission>) {
        if let Some(submission) = submission {
            self.submission_data = Some(submission);
        }
        self.status = status;
        self.generation = generation;
        self.submitted_at = Some(Utc::now());
        self.evaluation_completed_at = None;
        self.check_results.clear();
    }

    /// Applies the results of run `generation`. Returns `false` and leaves the
    /// record untouched when that run has been superseded.
    pub fn complete(&mut self, generation: u64, results: Vec<CheckResult>) -> bool {
        if generation != self.generation || !self.status.is_running() {
            return false;
        }
        self.status = EvaluationStatus::Completed;
        self.evaluation_completed_at = Some(Utc::now());
        self.check_results = results;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub request: TaskRequest,
    pub sent_at: DateTime<Utc>,
    #[serde(rename = "student_response_code")]
    pub response_status: Option<u16>,
    #[serde(rename = "student_response_body")]
    pub response_body: Option<String>,
    /// `request.checks`, interpreted once at dispatch.
    #[serde(skip)]
    pub specs: Vec<CheckSpec>,
    pub evaluation: EvaluationRecord,
}

impl TaskRecord {
    /// New record in the `sent` state, created before the producer is contacted.
    pub fn new(request: TaskRequest) -> Self {
        let specs = interpret_all(&request.checks);
        Self {
            request,
            sent_at: Utc::now(),
            response_status: None,
            response_body: None,
            specs,
            evaluation: EvaluationRecord {
                status: EvaluationStatus::Sent,
                ..Default::default()
            },
        }
    }

    pub fn task_id(&self) -> &str {
        &self.request.task
    }

    /// Whether `submission` answers this dispatch (same nonce and round).
    pub fn accepts(&self, submission: &Submission) -> bool {
        self.request.nonce == submission.nonce && self.request.round == submission.round
    }
}
