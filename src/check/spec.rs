use serde::{Deserialize, Serialize};

/// Selector used by row-count checks whose description does not name a table.
pub const DEFAULT_TABLE_SELECTOR: &str = "#sales-table";

/// Executable form of a check description.
///
/// `label` is always the original description and is what gets reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckSpec {
    TitleEquals {
        label: String,
        expected: String,
    },
    ElementVisible {
        label: String,
        selector: String,
    },
    ElementsVisible {
        label: String,
        selectors: Vec<String>,
    },
    ElementTextEquals {
        label: String,
        selector: String,
        expected: String,
    },
    TableMinRows {
        label: String,
        selector: String,
        min_rows: usize,
    },
    Scenario {
        label: String,
        scenario: ScenarioSpec,
    },
    Unrecognized {
        label: String,
    },
}

impl CheckSpec {
    pub fn label(&self) -> &str {
        match self {
            CheckSpec::TitleEquals { label, .. }
            | CheckSpec::ElementVisible { label, .. }
            | CheckSpec::ElementsVisible { label, .. }
            | CheckSpec::ElementTextEquals { label, .. }
            | CheckSpec::TableMinRows { label, .. }
            | CheckSpec::Scenario { label, .. }
            | CheckSpec::Unrecognized { label } => label,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, CheckSpec::Unrecognized { .. })
    }
}

/// Strips the leading `#` so a selector can be used as an element id.
pub fn element_id(selector: &str) -> &str {
    selector.trim().trim_start_matches('#')
}

/// Hand-authored multi-step interactions against the GitHub user page fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioSpec {
    /// Enter `octocat`, click fetch, expect the account creation date.
    CreationDateLookup,
    /// Enter `octocat`, click fetch, expect `Loading...` then an empty status.
    LoadingStatusCycle,
    /// Enter an unknown user, click fetch, expect `User not found`.
    MissingUserStatus,
}

pub const USERNAME_INPUT: &str = "username-input";
pub const FETCH_BUTTON: &str = "fetch-btn";
pub const CREATION_DATE: &str = "creation-date";
pub const API_STATUS: &str = "api-status";

const KNOWN_USER: &str = "octocat";
const UNKNOWN_USER: &str = "nonexistentuser123456789";

/// How long an await step may poll before the step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitBudget {
    /// Transient states that only exist for a moment.
    Short,
    /// Network-backed states.
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    Contains(&'static str),
    Equals(&'static str),
}

impl TextMatch {
    pub fn matches(&self, actual: &str) -> bool {
        match self {
            TextMatch::Contains(expected) => actual.contains(expected),
            TextMatch::Equals(expected) => actual == *expected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioStep {
    /// Clears the input and types `text`.
    Fill {
        element: &'static str,
        text: &'static str,
    },
    Click {
        element: &'static str,
    },
    AwaitText {
        element: &'static str,
        expected: TextMatch,
        budget: WaitBudget,
    },
}

impl ScenarioSpec {
    pub fn steps(&self) -> Vec<ScenarioStep> {
        let fetch = |user| {
            [
                ScenarioStep::Fill {
                    element: USERNAME_INPUT,
                    text: user,
                },
                ScenarioStep::Click {
                    element: FETCH_BUTTON,
                },
            ]
        };

        match self {
            ScenarioSpec::CreationDateLookup => {
                let mut steps = fetch(KNOWN_USER).to_vec();
                steps.push(ScenarioStep::AwaitText {
                    element: CREATION_DATE,
                    expected: TextMatch::Contains("2011-01-25"),
                    budget: WaitBudget::Long,
                });
                steps
            }
            ScenarioSpec::LoadingStatusCycle => {
                let mut steps = fetch(KNOWN_USER).to_vec();
                steps.push(ScenarioStep::AwaitText {
                    element: API_STATUS,
                    expected: TextMatch::Contains("Loading..."),
                    budget: WaitBudget::Short,
                });
                steps.push(ScenarioStep::AwaitText {
                    element: API_STATUS,
                    expected: TextMatch::Equals(""),
                    budget: WaitBudget::Long,
                });
                steps
            }
            ScenarioSpec::MissingUserStatus => {
                let mut steps = fetch(UNKNOWN_USER).to_vec();
                steps.push(ScenarioStep::AwaitText {
                    element: API_STATUS,
                    expected: TextMatch::Contains("User not found"),
                    budget: WaitBudget::Long,
                });
                steps
            }
        }
    }

    pub fn success_detail(&self) -> &'static str {
        match self {
            ScenarioSpec::CreationDateLookup => "GitHub user fetch for 'octocat' was successful.",
            ScenarioSpec::LoadingStatusCycle => "#api-status shows 'Loading...' then becomes empty.",
            ScenarioSpec::MissingUserStatus => {
                "#api-status displays 'User not found' for non-existent user."
            }
        }
    }
}
