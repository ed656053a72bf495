use std::time::Duration;

use crate::{runner::RunnerConfig, task::RegistryConfig};

#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Where task requests are posted.
    pub producer_endpoint: String,
    pub shared_secret: String,
    /// Callback the producer notifies once its deployment is live.
    pub evaluation_url: String,
    pub producer_email: String,
    pub dispatch_timeout: Duration,
    pub allowed_origins: Vec<String>,
    pub runner: RunnerConfig,
    pub registry: RegistryConfig,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            producer_endpoint: "http://127.0.0.1:8000/task".to_string(),
            shared_secret: generate_secret(),
            evaluation_url: "http://127.0.0.1:8000/notify".to_string(),
            producer_email: "student@example.com".to_string(),
            dispatch_timeout: Duration::from_secs(15),
            allowed_origins: vec!["*".to_string()],
            runner: RunnerConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

pub fn generate_secret() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Splits a comma separated origin list, falling back to `*` when nothing remains.
pub fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();
    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}
