//! Turns check descriptions into [`CheckSpec`]s.
//!
//! Descriptions are written from a small set of sentence templates, so the
//! matching is prefix/substring based rather than a grammar. Anything that does
//! not fit a template becomes [`CheckSpec::Unrecognized`].

use crate::check::spec::{CheckSpec, DEFAULT_TABLE_SELECTOR, ScenarioSpec};

pub fn interpret(description: &str) -> CheckSpec {
    let label = description.to_string();
    let unrecognized = || CheckSpec::Unrecognized {
        label: description.to_string(),
    };

    if let Some(rest) = description.strip_prefix("Page title is") {
        return CheckSpec::TitleEquals {
            label,
            expected: rest.trim().trim_matches(|c| c == '\'' || c == '"').to_string(),
        };
    }

    if description.starts_with("Page contains an element with id")
        || description.starts_with("Page contains a table with id")
    {
        return match quoted(description).into_iter().next() {
            Some(selector) => CheckSpec::ElementVisible {
                label,
                selector: selector.to_string(),
            },
            None => unrecognized(),
        };
    }

    if description.starts_with("Page has an input with id") {
        let selectors: Vec<String> = quoted(description).into_iter().map(String::from).collect();
        if selectors.is_empty() {
            return unrecognized();
        }
        return CheckSpec::ElementsVisible { label, selectors };
    }

    if description.starts_with("The text content of") {
        let parts = quoted(description);
        return match (parts.first(), parts.get(1)) {
            (Some(selector), Some(expected)) => CheckSpec::ElementTextEquals {
                label,
                selector: selector.to_string(),
                expected: expected.to_string(),
            },
            _ => unrecognized(),
        };
    }

    if let Some(pos) = description.find("Table has at least") {
        let tail = &description[pos + "Table has at least".len()..];
        let Some(min_rows) = tail
            .split_whitespace()
            .next()
            .and_then(|n| n.parse::<usize>().ok())
        else {
            return unrecognized();
        };
        let selector = quoted(description)
            .into_iter()
            .find(|s| s.starts_with('#'))
            .unwrap_or(DEFAULT_TABLE_SELECTOR)
            .to_string();
        return CheckSpec::TableMinRows {
            label,
            selector,
            min_rows,
        };
    }

    let scenario = if description.contains("After entering 'octocat'") {
        Some(ScenarioSpec::CreationDateLookup)
    } else if description.contains("When fetching user 'octocat'") {
        Some(ScenarioSpec::LoadingStatusCycle)
    } else if description.contains("When fetching a user that does not exist") {
        Some(ScenarioSpec::MissingUserStatus)
    } else {
        None
    };

    match scenario {
        Some(scenario) => CheckSpec::Scenario { label, scenario },
        None => unrecognized(),
    }
}

pub fn interpret_all<S: AsRef<str>>(descriptions: &[S]) -> Vec<CheckSpec> {
    descriptions.iter().map(|d| interpret(d.as_ref())).collect()
}

/// Segments enclosed in single quotes, in order of appearance.
fn quoted(text: &str) -> Vec<&str> {
    let complete = text.matches('\'').count() / 2;
    text.split('\'').skip(1).step_by(2).take(complete).collect()
}
