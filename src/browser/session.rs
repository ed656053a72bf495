use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// What a check can observe about one element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementState {
    pub text: String,
    pub visible: bool,
}

/// Minimal browser surface the checks need.
///
/// Elements are addressed by id (no leading `#`); row counts take a CSS
/// selector. `Ok(None)` from [`BrowserSession::element`] means the element
/// does not exist, which is not an error.
#[async_trait]
pub trait BrowserSession: Send {
    async fn goto(&mut self, url: &str) -> Result<()>;

    async fn title(&mut self) -> Result<String>;

    async fn element(&mut self, id: &str) -> Result<Option<ElementState>>;

    async fn count(&mut self, css: &str) -> Result<usize>;

    /// Clears the input and types `text` into it.
    async fn fill(&mut self, id: &str, text: &str) -> Result<()>;

    async fn click(&mut self, id: &str) -> Result<()>;

    /// Ends the session. Must be safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub webdriver_url: String,
    pub page_load_timeout: Duration,
    /// Pause after navigation before the first check runs.
    pub settle_delay: Duration,
    pub element_timeout: Duration,
    pub transient_timeout: Duration,
    pub scenario_timeout: Duration,
    pub poll_interval: Duration,
    /// Upper bound for any single check, waits included.
    pub check_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            page_load_timeout: Duration::from_secs(15),
            settle_delay: Duration::from_secs(2),
            element_timeout: Duration::from_secs(5),
            transient_timeout: Duration::from_secs(2),
            scenario_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            check_timeout: Duration::from_secs(30),
        }
    }
}
