pub mod dispatcher;

use std::{collections::BTreeMap, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub use dispatcher::{ProducerClient, ProducerResponse};

use crate::{
    check::CheckSpec,
    config::EvaluatorConfig,
    error::{Error, Result, eval_error::EvalError},
    runner::{CheckRunner, ProcessRunner, RunRequest, reconcile},
    task::{
        Completion, EvaluationStatus, Submission, TaskRecord, TaskRegistry, TaskRequest, fixture,
    },
};

/// Result of handing a task to the producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent { task_id: String },
    /// The producer answered with a non-2xx status.
    Rejected {
        task_id: String,
        status: u16,
        body: String,
    },
}

/// A background evaluation run that has been started.
#[derive(Debug)]
pub struct Scheduled {
    pub task_id: String,
    pub generation: u64,
    /// Resolves once the run's results have been offered to the registry.
    /// Dropping it leaves the run going.
    pub handle: JoinHandle<Completion>,
}

/// Drives tasks from dispatch through evaluation.
pub struct Orchestrator {
    registry: Arc<TaskRegistry>,
    producer: ProducerClient,
    runner: Arc<dyn CheckRunner>,
    config: EvaluatorConfig,
}

impl Orchestrator {
    /// Orchestrator that evaluates through the `check-runner` process.
    pub fn new(config: EvaluatorConfig) -> Self {
        let runner = Arc::new(ProcessRunner::new(config.runner.clone()));
        Self::with_runner(config, runner)
    }

    pub fn with_runner(config: EvaluatorConfig, runner: Arc<dyn CheckRunner>) -> Self {
        let producer = ProducerClient::new(&config.producer_endpoint, config.dispatch_timeout);
        let registry = Arc::new(TaskRegistry::new(config.registry.clone()));
        Self {
            registry,
            producer,
            runner,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Dispatches round `round` of the built-in `family`.
    pub async fn start(&self, family: &str, round: u32) -> Result<DispatchOutcome> {
        let fixture = fixture(family, round).ok_or_else(|| {
            Error::EvalError(EvalError::FixtureNotFound {
                family: family.to_string(),
                round,
            })
        })?;
        let request = fixture.to_request(
            round,
            &self.config.producer_email,
            &self.config.shared_secret,
            &self.config.evaluation_url,
        );
        self.dispatch(request).await
    }

    /// Records the task as `sent`, then posts it to the producer.
    pub async fn dispatch(&self, request: TaskRequest) -> Result<DispatchOutcome> {
        let task_id = request.task.clone();
        let record = TaskRecord::new(request);
        let sent_at = record.sent_at;

        info!(
            "Sending task {} (Round {}) to {}",
            task_id,
            record.request.round,
            self.producer.endpoint()
        );
        if self.registry.insert(record.clone()).await.is_some() {
            info!("Replaced existing record for task {}", task_id);
        }

        match self.producer.send(&record.request).await {
            Ok(response) => {
                let accepted = response.is_success();
                self.record_response(&task_id, sent_at, Some(&response)).await;
                if accepted {
                    info!(
                        "Successfully sent task {}. Producer responded with {}",
                        task_id, response.status
                    );
                    Ok(DispatchOutcome::Sent { task_id })
                } else {
                    error!(
                        "Producer returned {} for task {}: {}",
                        response.status, task_id, response.body
                    );
                    Ok(DispatchOutcome::Rejected {
                        task_id,
                        status: response.status,
                        body: response.body,
                    })
                }
            }
            Err(e) => {
                self.record_response(&task_id, sent_at, None).await;
                Err(e)
            }
        }
    }

    /// Stores the producer's answer on the dispatch that produced it. A missing
    /// or non-2xx answer marks the task `failed_to_send` unless a notification
    /// already moved it on.
    async fn record_response(
        &self,
        task_id: &str,
        sent_at: chrono::DateTime<chrono::Utc>,
        response: Option<&ProducerResponse>,
    ) {
        let updated = self
            .registry
            .update(task_id, |record| {
                if record.sent_at != sent_at {
                    return Ok(false);
                }
                if let Some(response) = response {
                    record.response_status = Some(response.status);
                    record.response_body = Some(response.body.clone());
                }
                let failed = response.is_none_or(|r| !r.is_success());
                if failed && record.evaluation.status == EvaluationStatus::Sent {
                    record.evaluation.status = EvaluationStatus::FailedToSend;
                }
                Ok(true)
            })
            .await;
        if !matches!(updated, Ok(true)) {
            warn!("Task {} was replaced before its dispatch finished", task_id);
        }
    }

    /// Accepts the producer's notification and starts evaluating its deployment.
    pub async fn notify(&self, submission: Submission) -> Result<Scheduled> {
        let task_id = submission.task.clone();
        info!("Received submission for task: {}", task_id);

        let generation = self.registry.allocate_generation();
        let pages_url = submission.pages_url.clone();
        let begun = self
            .registry
            .update(&task_id, |record| {
                if !record.accepts(&submission) {
                    return Err(EvalError::SubmissionMismatch(task_id.clone()).into());
                }
                record
                    .evaluation
                    .begin(EvaluationStatus::Evaluating, generation, Some(submission));
                Ok((record.request.checks.clone(), record.specs.clone()))
            })
            .await;

        let (checks, specs) = match begun {
            Ok(run) => run,
            Err(e) => {
                warn!("Rejected submission for task {}: {}", task_id, e);
                return Err(e);
            }
        };

        info!(
            "Starting background evaluation for {} at URL: {}",
            task_id, pages_url
        );
        Ok(self.schedule(task_id, generation, pages_url, checks, specs))
    }

    /// Re-runs the dispatched checks against the last submitted deployment.
    pub async fn re_evaluate(&self, task_id: &str) -> Result<Scheduled> {
        let generation = self.registry.allocate_generation();
        let (pages_url, checks, specs) = self
            .registry
            .update(task_id, |record| {
                let pages_url = match &record.evaluation.submission_data {
                    None => return Err(EvalError::MissingSubmission(task_id.to_string()).into()),
                    Some(submission) if submission.pages_url.trim().is_empty() => {
                        return Err(EvalError::MissingPagesUrl(task_id.to_string()).into());
                    }
                    Some(submission) => submission.pages_url.clone(),
                };
                record
                    .evaluation
                    .begin(EvaluationStatus::ReEvaluating, generation, None);
                Ok((pages_url, record.request.checks.clone(), record.specs.clone()))
            })
            .await?;

        info!(
            "Re-running evaluation for task {} at URL: {}",
            task_id, pages_url
        );
        Ok(self.schedule(task_id.to_string(), generation, pages_url, checks, specs))
    }

    pub async fn result(&self, task_id: &str) -> Result<TaskRecord> {
        self.registry
            .get(task_id)
            .await
            .ok_or_else(|| EvalError::TaskNotFound(task_id.to_string()).into())
    }

    pub async fn results(&self) -> BTreeMap<String, TaskRecord> {
        self.registry.all().await
    }

    fn schedule(
        &self,
        task_id: String,
        generation: u64,
        pages_url: String,
        checks: Vec<String>,
        specs: Vec<CheckSpec>,
    ) -> Scheduled {
        let registry = self.registry.clone();
        let runner = self.runner.clone();
        let request = RunRequest::new(pages_url, checks).with_specs(specs);
        let run_task_id = task_id.clone();

        let handle = tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(runner.run(&request)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!("Evaluation run for task {} panicked", run_task_id);
                    Err(EvalError::RunnerPanicked.into())
                }
            };
            if let Err(e) = &outcome {
                error!("Runner failed for task {}: {}", run_task_id, e);
            }

            let results = reconcile(&request.checks, outcome);
            let passed = results.iter().filter(|r| r.passed).count();
            let total = results.len();

            let completion = registry.complete(&run_task_id, generation, results).await;
            match completion {
                Completion::Applied => info!(
                    "Evaluation completed for task {}: {}/{} checks passed",
                    run_task_id, passed, total
                ),
                Completion::Stale => warn!(
                    "Discarded results of superseded run {} for task {}",
                    generation, run_task_id
                ),
                Completion::Missing => warn!(
                    "Task {} disappeared before run {} completed",
                    run_task_id, generation
                ),
            }
            completion
        });

        Scheduled {
            task_id,
            generation,
            handle,
        }
    }
}
