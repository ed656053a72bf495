use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator, elements::Element};
use serde_json::json;
use tracing::debug;

use crate::{
    browser::session::{BrowserSession, ElementState, SessionConfig},
    error::{Result, eval_error::EvalError},
};

const CHROME_ARGS: [&str; 4] = [
    "--headless",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
];

fn browser_error(context: &str, err: impl std::fmt::Display) -> EvalError {
    EvalError::Browser(format!("{context}: {err}"))
}

/// Headless Chrome driven over the W3C WebDriver protocol.
pub struct WebDriverSession {
    client: Option<Client>,
}

impl WebDriverSession {
    pub async fn connect(config: &SessionConfig) -> Result<Self> {
        let mut capabilities = serde_json::Map::new();
        capabilities.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": CHROME_ARGS }),
        );

        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| browser_error("failed to start session", e))?;

        debug!("webdriver session opened at {}", config.webdriver_url);
        Ok(Self {
            client: Some(client),
        })
    }

    fn client(&self) -> Result<&Client> {
        Ok(self
            .client
            .as_ref()
            .ok_or_else(|| EvalError::Browser("session already closed".into()))?)
    }

    async fn find(&self, id: &str) -> Result<Option<Element>> {
        let mut found = self
            .client()?
            .find_all(Locator::Id(id))
            .await
            .map_err(|e| browser_error("element lookup failed", e))?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    async fn require(&self, id: &str) -> Result<Element> {
        Ok(self
            .find(id)
            .await?
            .ok_or_else(|| EvalError::ElementNotFound(id.to_string()))?)
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.client()?
            .goto(url)
            .await
            .map_err(|e| browser_error("navigation failed", e))?;
        Ok(())
    }

    async fn title(&mut self) -> Result<String> {
        Ok(self
            .client()?
            .title()
            .await
            .map_err(|e| browser_error("reading title failed", e))?)
    }

    async fn element(&mut self, id: &str) -> Result<Option<ElementState>> {
        let Some(element) = self.find(id).await? else {
            return Ok(None);
        };
        let text = element
            .text()
            .await
            .map_err(|e| browser_error("reading text failed", e))?;
        let visible = element
            .is_displayed()
            .await
            .map_err(|e| browser_error("reading visibility failed", e))?;
        Ok(Some(ElementState { text, visible }))
    }

    async fn count(&mut self, css: &str) -> Result<usize> {
        let found = self
            .client()?
            .find_all(Locator::Css(css))
            .await
            .map_err(|e| browser_error("element lookup failed", e))?;
        Ok(found.len())
    }

    async fn fill(&mut self, id: &str, text: &str) -> Result<()> {
        let input = self.require(id).await?;
        input
            .clear()
            .await
            .map_err(|e| browser_error("clearing input failed", e))?;
        input
            .send_keys(text)
            .await
            .map_err(|e| browser_error("typing failed", e))?;
        Ok(())
    }

    async fn click(&mut self, id: &str) -> Result<()> {
        self.require(id)
            .await?
            .click()
            .await
            .map_err(|e| browser_error("click failed", e))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| browser_error("closing session failed", e))?;
            debug!("webdriver session closed");
        }
        Ok(())
    }
}
