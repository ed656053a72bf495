use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::{
    browser::session::{BrowserSession, ElementState, SessionConfig},
    check::{
        CheckResult, CheckSpec, ScenarioSpec, ScenarioStep, TextMatch, WaitBudget,
        spec::element_id,
    },
    error::Result,
};

#[derive(Debug, Clone, Copy)]
enum Condition<'a> {
    Present,
    Visible,
    TextEquals(&'a str),
    TextContains(&'a str),
}

impl Condition<'_> {
    fn holds(&self, state: &ElementState) -> bool {
        match self {
            Condition::Present => true,
            Condition::Visible => state.visible,
            Condition::TextEquals(expected) => state.text.trim() == *expected,
            Condition::TextContains(expected) => state.text.contains(expected),
        }
    }

    fn describe(&self) -> String {
        match self {
            Condition::Present => "exist".to_string(),
            Condition::Visible => "become visible".to_string(),
            Condition::TextEquals("") => "become empty".to_string(),
            Condition::TextEquals(expected) => format!("have text '{expected}'"),
            Condition::TextContains(expected) => format!("contain '{expected}'"),
        }
    }
}

impl From<TextMatch> for Condition<'static> {
    fn from(value: TextMatch) -> Self {
        match value {
            TextMatch::Contains(expected) => Condition::TextContains(expected),
            TextMatch::Equals(expected) => Condition::TextEquals(expected),
        }
    }
}

enum Wait {
    Met(ElementState),
    /// Carries the last observed state, `None` if the element never existed.
    TimedOut(Option<ElementState>),
}

fn timed_out_detail(id: &str, condition: Condition<'_>, timeout: Duration, last: Option<&ElementState>) -> String {
    match last {
        None => format!("Timed out after {timeout:?} waiting for '#{id}': element not found."),
        Some(state) => format!(
            "Timed out after {timeout:?} waiting for '#{id}' to {}; last seen text '{}'.",
            condition.describe(),
            state.text
        ),
    }
}

/// Executes one [`CheckSpec`] against an open session.
///
/// Assertion failures come back as `Ok` with `passed == false`; `Err` is
/// reserved for the session itself failing (missing input, driver error).
pub struct CheckExecutor<'a> {
    config: &'a SessionConfig,
}

impl<'a> CheckExecutor<'a> {
    pub fn new(config: &'a SessionConfig) -> Self {
        Self { config }
    }

    pub async fn execute<S>(&self, session: &mut S, spec: &CheckSpec) -> Result<CheckResult>
    where
        S: BrowserSession + ?Sized,
    {
        let label = spec.label();
        debug!("executing check: {}", label);

        let result = match spec {
            CheckSpec::TitleEquals { expected, .. } => {
                let actual = session.title().await?;
                if actual == *expected {
                    CheckResult::pass(label, format!("Page title is correctly '{expected}'."))
                } else {
                    CheckResult::fail(
                        label,
                        format!("Expected title '{expected}', but got '{actual}'."),
                    )
                }
            }

            CheckSpec::ElementVisible { selector, .. } => {
                match self.check_visible(session, selector).await? {
                    None => CheckResult::pass(label, format!("Element with id '{selector}' is visible.")),
                    Some(detail) => CheckResult::fail(label, detail),
                }
            }

            CheckSpec::ElementsVisible { selectors, .. } => {
                let mut failure = None;
                for selector in selectors {
                    if let Some(detail) = self.check_visible(session, selector).await? {
                        failure = Some(detail);
                        break;
                    }
                }
                match failure {
                    None => CheckResult::pass(
                        label,
                        format!("Elements {} are visible.", quote_list(selectors)),
                    ),
                    Some(detail) => CheckResult::fail(label, detail),
                }
            }

            CheckSpec::ElementTextEquals {
                selector, expected, ..
            } => {
                let id = element_id(selector);
                let condition = Condition::TextEquals(expected);
                match self
                    .wait_for(session, id, condition, self.config.element_timeout)
                    .await?
                {
                    Wait::Met(_) => CheckResult::pass(
                        label,
                        format!("Element '{id}' has correct text: '{expected}'."),
                    ),
                    Wait::TimedOut(Some(state)) => CheckResult::fail(
                        label,
                        format!("Expected text '{expected}', but got '{}'.", state.text.trim()),
                    ),
                    Wait::TimedOut(None) => CheckResult::fail(
                        label,
                        timed_out_detail(id, condition, self.config.element_timeout, None),
                    ),
                }
            }

            CheckSpec::TableMinRows {
                selector, min_rows, ..
            } => {
                let rows = self.wait_for_rows(session, selector, *min_rows).await?;
                if rows >= *min_rows {
                    CheckResult::pass(
                        label,
                        format!("Table has {rows} data rows, meeting the requirement."),
                    )
                } else {
                    CheckResult::fail(
                        label,
                        format!("Expected at least {min_rows} rows, but found {rows}."),
                    )
                }
            }

            CheckSpec::Scenario { scenario, .. } => match self.run_scenario(session, *scenario).await? {
                None => CheckResult::pass(label, scenario.success_detail()),
                Some(detail) => CheckResult::fail(label, detail),
            },

            CheckSpec::Unrecognized { .. } => {
                CheckResult::fail(label, format!("Unknown check type: {label}"))
            }
        };

        Ok(result)
    }

    /// `None` when visible, otherwise the failure detail.
    async fn check_visible<S>(&self, session: &mut S, selector: &str) -> Result<Option<String>>
    where
        S: BrowserSession + ?Sized,
    {
        let id = element_id(selector);
        let timeout = self.config.element_timeout;
        Ok(match self.wait_for(session, id, Condition::Visible, timeout).await? {
            Wait::Met(_) => None,
            Wait::TimedOut(Some(_)) => Some(format!(
                "Element with id '{selector}' exists but is not visible after {timeout:?}."
            )),
            Wait::TimedOut(None) => Some(timed_out_detail(id, Condition::Visible, timeout, None)),
        })
    }

    /// `None` when every step succeeded, otherwise the failure detail.
    async fn run_scenario<S>(&self, session: &mut S, scenario: ScenarioSpec) -> Result<Option<String>>
    where
        S: BrowserSession + ?Sized,
    {
        for step in scenario.steps() {
            match step {
                ScenarioStep::Fill { element, text } => session.fill(element, text).await?,
                ScenarioStep::Click { element } => session.click(element).await?,
                ScenarioStep::AwaitText {
                    element,
                    expected,
                    budget,
                } => {
                    let timeout = match budget {
                        WaitBudget::Short => self.config.transient_timeout,
                        WaitBudget::Long => self.config.scenario_timeout,
                    };
                    let condition = Condition::from(expected);
                    if let Wait::TimedOut(last) =
                        self.wait_for(session, element, condition, timeout).await?
                    {
                        return Ok(Some(timed_out_detail(
                            element,
                            condition,
                            timeout,
                            last.as_ref(),
                        )));
                    }
                }
            }
        }
        Ok(None)
    }

    async fn wait_for<S>(
        &self,
        session: &mut S,
        id: &str,
        condition: Condition<'_>,
        timeout: Duration,
    ) -> Result<Wait>
    where
        S: BrowserSession + ?Sized,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let state = session.element(id).await?;
            if let Some(state) = &state
                && condition.holds(state)
            {
                return Ok(Wait::Met(state.clone()));
            }
            if Instant::now() >= deadline {
                return Ok(Wait::TimedOut(state));
            }
            sleep(self.config.poll_interval).await;
        }
    }

    async fn wait_for_rows<S>(&self, session: &mut S, selector: &str, min_rows: usize) -> Result<usize>
    where
        S: BrowserSession + ?Sized,
    {
        let css = format!("{} tbody tr", selector.trim());
        let deadline = Instant::now() + self.config.element_timeout;
        loop {
            let rows = session.count(&css).await?;
            if rows >= min_rows || Instant::now() >= deadline {
                return Ok(rows);
            }
            sleep(self.config.poll_interval).await;
        }
    }
}

fn quote_list(selectors: &[String]) -> String {
    selectors
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
