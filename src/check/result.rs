use serde::{Deserialize, Serialize};

/// Outcome of one check, in the shape the runner writes to stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: String,
    pub passed: bool,
    pub details: String,
}

impl CheckResult {
    pub fn pass(check: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            passed: true,
            details: details.into(),
        }
    }

    pub fn fail(check: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            passed: false,
            details: details.into(),
        }
    }

    /// One failed result per check, all carrying the same detail.
    pub fn failed_batch<S: AsRef<str>>(checks: &[S], details: &str) -> Vec<Self> {
        checks
            .iter()
            .map(|c| Self::fail(c.as_ref(), details))
            .collect()
    }
}
