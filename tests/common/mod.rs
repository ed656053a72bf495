#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use ruseval::{
    browser::{BrowserSession, ElementState, SessionConfig},
    check::CheckResult,
    error::{Result, eval_error::EvalError},
    runner::{CheckRunner, RunRequest},
};
use tokio::{sync::Notify, time::Instant};

/// Session settings scaled down so waits finish in milliseconds.
pub fn fast_config() -> SessionConfig {
    SessionConfig {
        webdriver_url: "http://127.0.0.1:1".to_string(),
        page_load_timeout: Duration::from_millis(500),
        settle_delay: Duration::ZERO,
        element_timeout: Duration::from_millis(200),
        transient_timeout: Duration::from_millis(300),
        scenario_timeout: Duration::from_millis(600),
        poll_interval: Duration::from_millis(10),
        check_timeout: Duration::from_secs(2),
    }
}

/// Text changes a click schedules: `(delay, element id, new text)`.
pub type Reaction = Box<dyn Fn(&HashMap<String, String>) -> Vec<(Duration, String, String)> + Send>;

/// In-memory page standing in for a WebDriver session.
#[derive(Default)]
pub struct FakePage {
    pub title: String,
    pub elements: HashMap<String, ElementState>,
    pub rows: HashMap<String, usize>,
    pub inputs: HashMap<String, String>,
    pub visited: Vec<String>,
    pub closed: usize,
    pub fail_goto: bool,
    /// Element ids whose lookup fails with a driver error.
    pub broken: Vec<String>,
    pub panic_on_title: bool,
    reactions: HashMap<String, Reaction>,
    pending: Vec<(Instant, String, String)>,
}

impl FakePage {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn with_element(mut self, id: &str, text: &str) -> Self {
        self.elements.insert(
            id.to_string(),
            ElementState {
                text: text.to_string(),
                visible: true,
            },
        );
        self
    }

    pub fn with_hidden(mut self, id: &str) -> Self {
        self.elements.insert(
            id.to_string(),
            ElementState {
                text: String::new(),
                visible: false,
            },
        );
        self
    }

    pub fn with_rows(mut self, css: &str, rows: usize) -> Self {
        self.rows.insert(css.to_string(), rows);
        self
    }

    pub fn on_click<F>(mut self, id: &str, reaction: F) -> Self
    where
        F: Fn(&HashMap<String, String>) -> Vec<(Duration, String, String)> + Send + 'static,
    {
        self.reactions.insert(id.to_string(), Box::new(reaction));
        self
    }

    /// A page with the GitHub lookup controls wired like a working deployment.
    pub fn github_user_page() -> Self {
        FakePage::new("GitHub User")
            .with_element("username-input", "")
            .with_element("fetch-btn", "Fetch")
            .with_element("creation-date", "")
            .with_element("api-status", "")
            .on_click("fetch-btn", |inputs| {
                let user = inputs.get("username-input").cloned().unwrap_or_default();
                let mut changes = vec![(Duration::ZERO, "api-status".to_string(), "Loading...".to_string())];
                if user == "octocat" {
                    changes.push((
                        Duration::from_millis(60),
                        "creation-date".to_string(),
                        "Created: 2011-01-25T18:44:36Z".to_string(),
                    ));
                    changes.push((Duration::from_millis(60), "api-status".to_string(), String::new()));
                } else {
                    changes.push((
                        Duration::from_millis(60),
                        "api-status".to_string(),
                        "User not found".to_string(),
                    ));
                }
                changes
            })
    }

    fn apply_due(&mut self) {
        let now = Instant::now();
        let (due, later): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|(at, _, _)| *at <= now);
        self.pending = later;
        for (_, id, text) in due {
            self.elements.entry(id).or_default().text = text;
        }
    }

    fn require(&self, id: &str) -> Result<()> {
        if self.broken.iter().any(|b| b == id) {
            return Err(EvalError::Browser(format!("stale element reference: {id}")).into());
        }
        if !self.elements.contains_key(id) {
            return Err(EvalError::ElementNotFound(id.to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for FakePage {
    async fn goto(&mut self, url: &str) -> Result<()> {
        if self.fail_goto {
            return Err(EvalError::Browser("net::ERR_NAME_NOT_RESOLVED".into()).into());
        }
        self.visited.push(url.to_string());
        Ok(())
    }

    async fn title(&mut self) -> Result<String> {
        if self.panic_on_title {
            panic!("driver went away");
        }
        Ok(self.title.clone())
    }

    async fn element(&mut self, id: &str) -> Result<Option<ElementState>> {
        if self.broken.iter().any(|b| b == id) {
            return Err(EvalError::Browser(format!("stale element reference: {id}")).into());
        }
        self.apply_due();
        Ok(self.elements.get(id).cloned())
    }

    async fn count(&mut self, css: &str) -> Result<usize> {
        Ok(self.rows.get(css).copied().unwrap_or(0))
    }

    async fn fill(&mut self, id: &str, text: &str) -> Result<()> {
        self.require(id)?;
        self.inputs.insert(id.to_string(), text.to_string());
        Ok(())
    }

    async fn click(&mut self, id: &str) -> Result<()> {
        self.require(id)?;
        let changes = match self.reactions.get(id) {
            Some(reaction) => reaction(&self.inputs),
            None => Vec::new(),
        };
        let now = Instant::now();
        for (delay, element, text) in changes {
            self.pending.push((now + delay, element, text));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed += 1;
        Ok(())
    }
}

/// What a [`ScriptedRunner`] does when asked to run.
pub enum Script {
    PassAll,
    FailAll(&'static str),
    Error(EvalError),
    WrongLength,
    Panic,
}

/// Runner double that records requests and answers from a script. When
/// gated, run number `gated_call` waits for a permit before answering.
pub struct ScriptedRunner {
    script: Mutex<Vec<Script>>,
    pub requests: Mutex<Vec<RunRequest>>,
    pub calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    gated_call: usize,
}

impl ScriptedRunner {
    /// Scripts are consumed in order; the last one repeats.
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate: None,
            gated_call: 0,
        }
    }

    pub fn gated(script: Vec<Script>, gate: Arc<Notify>, gated_call: usize) -> Self {
        Self {
            gate: Some(gate),
            gated_call,
            ..Self::new(script)
        }
    }

    fn next_script(&self) -> Script {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.remove(0)
        } else {
            match script.first() {
                Some(Script::PassAll) | None => Script::PassAll,
                Some(Script::FailAll(detail)) => Script::FailAll(*detail),
                Some(Script::Error(_)) => Script::Error(EvalError::RunnerFailed {
                    status: "exit status: 1".into(),
                    stderr: "chrome crashed".into(),
                }),
                Some(Script::WrongLength) => Script::WrongLength,
                Some(Script::Panic) => Script::Panic,
            }
        }
    }
}

#[async_trait]
impl CheckRunner for ScriptedRunner {
    async fn run(&self, request: &RunRequest) -> Result<Vec<CheckResult>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let script = self.next_script();

        if let Some(gate) = &self.gate
            && call == self.gated_call
        {
            gate.notified().await;
        }

        match script {
            Script::PassAll => Ok(request
                .checks
                .iter()
                .map(|c| CheckResult::pass(c, format!("passed on run {call}")))
                .collect()),
            Script::FailAll(detail) => Ok(CheckResult::failed_batch(request.checks.as_slice(), detail)),
            Script::Error(e) => Err(e.into()),
            Script::WrongLength => Ok(vec![CheckResult::pass("only one", "ok")]),
            Script::Panic => panic!("runner blew up"),
        }
    }
}
