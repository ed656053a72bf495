use std::{io::Write, path::Path};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{
    check::{CheckSpec, interpret_all},
    error::Result,
};

/// Document handed to the isolated runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub pages_url: String,
    pub checks: Vec<String>,
    /// Pre-interpreted checks. Ignored unless it lines up with `checks`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<Vec<CheckSpec>>,
}

impl RunRequest {
    pub fn new(pages_url: impl Into<String>, checks: Vec<String>) -> Self {
        Self {
            pages_url: pages_url.into(),
            checks,
            specs: None,
        }
    }

    pub fn with_specs(mut self, specs: Vec<CheckSpec>) -> Self {
        self.specs = Some(specs);
        self
    }

    /// The specs to execute, one per entry in `checks`.
    pub fn resolve_specs(&self) -> Vec<CheckSpec> {
        match &self.specs {
            Some(specs)
                if specs.len() == self.checks.len()
                    && specs.iter().zip(&self.checks).all(|(s, c)| s.label() == c) =>
            {
                specs.clone()
            }
            _ => interpret_all(&self.checks),
        }
    }

    /// Writes the request to a temporary file that is removed on drop.
    pub fn write_temp(&self) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("ruseval-run-")
            .suffix(".json")
            .tempfile()?;
        serde_json::to_writer(&mut file, self)?;
        file.flush()?;
        Ok(file)
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }
}
