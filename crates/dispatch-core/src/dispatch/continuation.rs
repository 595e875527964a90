//! Hand-off from one worker hop to the next

use async_trait::async_trait;
use dispatch_types::{ResumeToken, WorkerRequest};
use log::debug;
use reqwest::Client as HttpClient;
use std::time::Duration;

use crate::error::{DispatchError, Result};

#[async_trait]
pub trait ContinuationScheduler: Send + Sync {
    /// Arrange for a new worker hop to start from `token`
    async fn schedule(&self, token: &ResumeToken) -> Result<()>;
}

/// Posts a detached worker request to the service's own worker endpoint
pub struct HttpContinuation {
    endpoint: String,
    http_client: HttpClient,
}

impl HttpContinuation {
    pub fn new(base_url: &str) -> Result<Self> {
        let http_client = HttpClient::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            endpoint: format!("{}/api/dispatch/worker", base_url.trim_end_matches('/')),
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ContinuationScheduler for HttpContinuation {
    async fn schedule(&self, token: &ResumeToken) -> Result<()> {
        let request = WorkerRequest {
            campaign_id: token.campaign_id.clone(),
            resume_token: Some(token.clone()),
            detached: true,
        };

        debug!("Scheduling hop {} for campaign {} via {}", token.hop, token.campaign_id, self.endpoint);
        let response = self.http_client.post(&self.endpoint).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Continuation(format!("worker endpoint returned {}: {}", status, body)));
        }

        Ok(())
    }
}
