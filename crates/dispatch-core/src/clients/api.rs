//! HTTP delivery client for Resend-compatible email APIs

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client as HttpClient;
use std::time::Duration;

use super::traits::DeliveryProvider;
use crate::error::{DispatchError, Result};
use crate::types::{DeliveryReceipt, OutboundMessage};

pub struct ApiDeliveryClient {
    base_url: String,
    api_key: String,
    slot: usize,
    http_client: HttpClient,
}

impl ApiDeliveryClient {
    /// `slot` is the credential's position in the pool, used only for logging
    pub fn new(base_url: &str, api_key: String, slot: usize, timeout: Duration) -> Result<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            slot,
            http_client,
        })
    }
}

#[async_trait]
impl DeliveryProvider for ApiDeliveryClient {
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt> {
        let url = format!("{}/emails", self.base_url);
        debug!("Posting message for {} via credential #{}", message.to, self.slot);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Delivery API rejected message to {}: {} {}", message.to, status, error_text);
            return Err(DispatchError::Delivery(format!(
                "Provider returned {}: {}",
                status, error_text
            )));
        }

        let receipt: DeliveryReceipt = response.json().await?;
        Ok(receipt)
    }

    fn name(&self) -> String {
        format!("api#{}", self.slot)
    }
}
