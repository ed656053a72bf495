use std::time::Duration;

use tracing::{debug, error};

use crate::{
    error::{Result, eval_error::EvalError},
    task::TaskRequest,
};

/// Raw answer from the producer, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerResponse {
    pub status: u16,
    pub body: String,
}

impl ProducerResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Posts task requests to the producer endpoint.
#[derive(Debug, Clone)]
pub struct ProducerClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl ProducerClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Only transport failures are errors; any HTTP status is returned as is.
    pub async fn send(&self, request: &TaskRequest) -> Result<ProducerResponse> {
        debug!("posting task {} to {}", request.task, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                error!("failed to reach producer at {}: {}", self.endpoint, e);
                EvalError::ProducerUnreachable(e.to_string())
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| EvalError::ProducerUnreachable(format!("failed to read response body: {e}")))?;

        Ok(ProducerResponse { status, body })
    }
}
