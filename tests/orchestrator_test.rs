mod common;

#[cfg(test)]
mod orchestrator_tests {
    use std::{
        sync::{Arc, atomic::Ordering},
        time::Duration,
    };

    use ruseval::{
        config::EvaluatorConfig,
        error::eval_error::EvalError,
        orchestrator::{DispatchOutcome, Orchestrator},
        task::{Completion, EvaluationStatus, Submission},
    };
    use serde_json::json;
    use tokio::sync::Notify;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::common::{Script, ScriptedRunner};

    const SALES_TASK: &str = "sales-report-a8b3d";
    const PAGES_URL: &str = "https://student.github.io/sales/";

    fn config(endpoint: String) -> EvaluatorConfig {
        EvaluatorConfig {
            producer_endpoint: endpoint,
            shared_secret: "s3cret".to_string(),
            dispatch_timeout: Duration::from_secs(2),
            ..Default::default()
        }
    }

    async fn accepting_producer() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/task"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"status\":\"received\"}"))
            .mount(&server)
            .await;
        server
    }

    fn build_orchestrator(server: &MockServer, runner: Arc<ScriptedRunner>) -> Orchestrator {
        Orchestrator::with_runner(config(format!("{}/task", server.uri())), runner)
    }

    fn submission(nonce: &str, round: u32) -> Submission {
        Submission {
            email: "student@example.com".to_string(),
            task: SALES_TASK.to_string(),
            round,
            nonce: nonce.to_string(),
            repo_url: "https://github.com/student/sales".to_string(),
            commit_sha: "4f2a9c1".to_string(),
            pages_url: PAGES_URL.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sales_report_round_one_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/task"))
            .and(body_partial_json(json!({
                "email": "student@example.com",
                "secret": "s3cret",
                "task": SALES_TASK,
                "round": 1,
                "nonce": "nonce-1a2b-3c4d",
                "evaluation_url": "http://127.0.0.1:8000/notify",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("queued"))
            .expect(1)
            .mount(&server)
            .await;
        let runner = Arc::new(ScriptedRunner::new(vec![Script::PassAll]));
        let orchestrator = build_orchestrator(&server, runner.clone());

        let outcome = orchestrator.start("sales-report", 1).await.unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Sent {
                task_id: SALES_TASK.to_string()
            }
        );

        let record = orchestrator.result(SALES_TASK).await.unwrap();
        assert_eq!(record.evaluation.status, EvaluationStatus::Sent);
        assert_eq!(record.response_status, Some(200));
        assert_eq!(record.response_body.as_deref(), Some("queued"));

        let scheduled = orchestrator
            .notify(submission("nonce-1a2b-3c4d", 1))
            .await
            .unwrap();
        assert_eq!(scheduled.handle.await.unwrap(), Completion::Applied);

        let record = orchestrator.result(SALES_TASK).await.unwrap();
        let evaluation = &record.evaluation;
        assert_eq!(evaluation.status, EvaluationStatus::Completed);
        assert_eq!(evaluation.check_results.len(), 3);
        assert!(evaluation.check_results.iter().all(|r| r.passed));
        assert_eq!(
            evaluation.check_results[0].check,
            "Page title is 'Sales Summary'"
        );
        assert!(evaluation.evaluation_completed_at.is_some());
        assert_eq!(
            evaluation.submission_data.as_ref().unwrap().commit_sha,
            "4f2a9c1"
        );

        let requests = runner.requests.lock().unwrap();
        assert_eq!(requests[0].pages_url, PAGES_URL);
        assert_eq!(requests[0].checks, record.request.checks);
        assert_eq!(requests[0].specs.as_ref().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_mismatched_submission_changes_nothing() {
        let server = accepting_producer().await;
        let runner = Arc::new(ScriptedRunner::new(vec![Script::PassAll]));
        let orchestrator = build_orchestrator(&server, runner.clone());
        orchestrator.start("sales-report", 1).await.unwrap();
        let before = orchestrator.result(SALES_TASK).await.unwrap();

        for bad in [submission("nonce-5e6f-7g8h", 1), submission("nonce-1a2b-3c4d", 2)] {
            let err = orchestrator.notify(bad).await.unwrap_err();
            assert!(matches!(err.as_eval(), Some(EvalError::SubmissionMismatch(_))));
        }

        assert_eq!(orchestrator.result(SALES_TASK).await.unwrap(), before);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_task_notification() {
        let server = accepting_producer().await;
        let orchestrator = build_orchestrator(&server, Arc::new(ScriptedRunner::new(vec![])));

        let err = orchestrator
            .notify(submission("nonce-1a2b-3c4d", 1))
            .await
            .unwrap_err();

        assert!(matches!(err.as_eval(), Some(EvalError::TaskNotFound(id)) if id == SALES_TASK));
        assert!(orchestrator.results().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_fixture() {
        let server = accepting_producer().await;
        let orchestrator = build_orchestrator(&server, Arc::new(ScriptedRunner::new(vec![])));

        let err = orchestrator.start("weather-widget", 1).await.unwrap_err();
        assert!(matches!(err.as_eval(), Some(EvalError::FixtureNotFound { .. })));

        let err = orchestrator.start("sales-report", 7).await.unwrap_err();
        assert!(matches!(err.as_eval(), Some(EvalError::FixtureNotFound { round: 7, .. })));
        assert!(orchestrator.results().await.is_empty());
    }

    #[tokio::test]
    async fn test_producer_rejection_marks_failed_to_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/task"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        let orchestrator = build_orchestrator(&server, Arc::new(ScriptedRunner::new(vec![])));

        let outcome = orchestrator.start("github-user-info", 2).await.unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Rejected {
                task_id: "github-user-info-c7e4f".to_string(),
                status: 500,
                body: "boom".to_string(),
            }
        );

        let record = orchestrator.result("github-user-info-c7e4f").await.unwrap();
        assert_eq!(record.evaluation.status, EvaluationStatus::FailedToSend);
        assert_eq!(record.response_status, Some(500));
        assert_eq!(record.response_body.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_unreachable_producer() {
        let orchestrator = Orchestrator::with_runner(
            config("http://127.0.0.1:1/task".to_string()),
            Arc::new(ScriptedRunner::new(vec![])),
        );

        let err = orchestrator.start("sales-report", 1).await.unwrap_err();
        assert!(matches!(err.as_eval(), Some(EvalError::ProducerUnreachable(_))));

        let record = orchestrator.result(SALES_TASK).await.unwrap();
        assert_eq!(record.evaluation.status, EvaluationStatus::FailedToSend);
        assert_eq!(record.response_status, None);
    }

    #[tokio::test]
    async fn test_runner_failures_still_complete() {
        let scripts = [
            (
                Script::Error(EvalError::RunnerFailed {
                    status: "exit status: 1".into(),
                    stderr: "chrome crashed".into(),
                }),
                "chrome crashed",
            ),
            (Script::WrongLength, "expected 3 results, got 1"),
            (Script::Panic, "runner panicked"),
        ];

        for (script, needle) in scripts {
            let server = accepting_producer().await;
            let orchestrator = build_orchestrator(&server, Arc::new(ScriptedRunner::new(vec![script])));
            orchestrator.start("sales-report", 1).await.unwrap();

            let scheduled = orchestrator
                .notify(submission("nonce-1a2b-3c4d", 1))
                .await
                .unwrap();
            assert_eq!(scheduled.handle.await.unwrap(), Completion::Applied);

            let record = orchestrator.result(SALES_TASK).await.unwrap();
            assert_eq!(record.evaluation.status, EvaluationStatus::Completed);
            assert_eq!(record.evaluation.check_results.len(), 3);
            for (result, check) in record.evaluation.check_results.iter().zip(&record.request.checks) {
                assert_eq!(&result.check, check);
                assert!(!result.passed);
                assert!(result.details.starts_with("Runner error"), "{}", result.details);
                assert!(result.details.contains(needle), "{}", result.details);
            }
        }
    }

    #[tokio::test]
    async fn test_re_evaluate_validation() {
        let server = accepting_producer().await;
        let orchestrator = build_orchestrator(&server, Arc::new(ScriptedRunner::new(vec![Script::PassAll])));

        let err = orchestrator.re_evaluate(SALES_TASK).await.unwrap_err();
        assert!(matches!(err.as_eval(), Some(EvalError::TaskNotFound(_))));

        orchestrator.start("sales-report", 1).await.unwrap();
        let err = orchestrator.re_evaluate(SALES_TASK).await.unwrap_err();
        assert!(matches!(err.as_eval(), Some(EvalError::MissingSubmission(_))));
        assert_eq!(
            orchestrator.result(SALES_TASK).await.unwrap().evaluation.status,
            EvaluationStatus::Sent
        );

        let mut empty_url = submission("nonce-1a2b-3c4d", 1);
        empty_url.pages_url = String::new();
        let scheduled = orchestrator.notify(empty_url).await.unwrap();
        scheduled.handle.await.unwrap();
        let err = orchestrator.re_evaluate(SALES_TASK).await.unwrap_err();
        assert!(matches!(err.as_eval(), Some(EvalError::MissingPagesUrl(_))));
    }

    #[tokio::test]
    async fn test_re_evaluate_resets_and_reruns() {
        let server = accepting_producer().await;
        let gate = Arc::new(Notify::new());
        let runner = Arc::new(ScriptedRunner::gated(vec![Script::PassAll], gate.clone(), 1));
        let orchestrator = build_orchestrator(&server, runner.clone());
        orchestrator.start("sales-report", 1).await.unwrap();

        let first = orchestrator
            .notify(submission("nonce-1a2b-3c4d", 1))
            .await
            .unwrap();
        first.handle.await.unwrap();
        let completed = orchestrator.result(SALES_TASK).await.unwrap().evaluation;

        let second = orchestrator.re_evaluate(SALES_TASK).await.unwrap();
        assert!(second.generation > first.generation);

        let running = orchestrator.result(SALES_TASK).await.unwrap().evaluation;
        assert_eq!(running.status, EvaluationStatus::ReEvaluating);
        assert!(running.check_results.is_empty());
        assert!(running.evaluation_completed_at.is_none());
        assert_eq!(running.submission_data, completed.submission_data);
        assert!(running.submitted_at >= completed.submitted_at);

        gate.notify_one();
        assert_eq!(second.handle.await.unwrap(), Completion::Applied);

        let rerun = orchestrator.result(SALES_TASK).await.unwrap().evaluation;
        assert_eq!(rerun.status, EvaluationStatus::Completed);
        assert_eq!(rerun.check_results.len(), completed.check_results.len());
        assert_eq!(rerun.check_results[0].details, "passed on run 1");

        let requests = runner.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].pages_url, PAGES_URL);
        assert_eq!(requests[1].checks, requests[0].checks);
    }

    #[tokio::test]
    async fn test_superseded_run_cannot_overwrite_newer_results() {
        let server = accepting_producer().await;
        let gate = Arc::new(Notify::new());
        let runner = Arc::new(ScriptedRunner::gated(
            vec![Script::FailAll("stale results"), Script::PassAll],
            gate.clone(),
            0,
        ));
        let orchestrator = build_orchestrator(&server, runner.clone());
        orchestrator.start("sales-report", 1).await.unwrap();

        let slow = orchestrator
            .notify(submission("nonce-1a2b-3c4d", 1))
            .await
            .unwrap();
        // the slow run must take the gated slot before the re-evaluation starts
        while runner.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        let fast = orchestrator.re_evaluate(SALES_TASK).await.unwrap();
        assert_eq!(fast.handle.await.unwrap(), Completion::Applied);

        gate.notify_one();
        assert_eq!(slow.handle.await.unwrap(), Completion::Stale);

        let evaluation = orchestrator.result(SALES_TASK).await.unwrap().evaluation;
        assert_eq!(evaluation.status, EvaluationStatus::Completed);
        assert_eq!(evaluation.generation, fast.generation);
        assert!(evaluation.check_results.iter().all(|r| r.passed));
    }

    #[tokio::test]
    async fn test_redispatch_discards_running_evaluation() {
        let server = accepting_producer().await;
        let gate = Arc::new(Notify::new());
        let runner = Arc::new(ScriptedRunner::gated(vec![Script::PassAll], gate.clone(), 0));
        let orchestrator = build_orchestrator(&server, runner);
        orchestrator.start("sales-report", 1).await.unwrap();

        let running = orchestrator
            .notify(submission("nonce-1a2b-3c4d", 1))
            .await
            .unwrap();
        orchestrator.start("sales-report", 2).await.unwrap();

        gate.notify_one();
        assert_eq!(running.handle.await.unwrap(), Completion::Stale);

        let record = orchestrator.result(SALES_TASK).await.unwrap();
        assert_eq!(record.request.round, 2);
        assert_eq!(record.request.nonce, "nonce-5e6f-7g8h");
        assert_eq!(record.evaluation.status, EvaluationStatus::Sent);
        assert!(record.evaluation.check_results.is_empty());
        assert_eq!(orchestrator.results().await.len(), 1);
    }
}
