//! OpenAI-compatible chat completion client

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::json;

use super::traits::TextCompleter;
use crate::config::OpenAIConfig;
use crate::error::{DispatchError, Result};
use crate::types::{ChatMessage, Completion, CompletionOptions};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiClient {
    config: OpenAIConfig,
    http_client: HttpClient,
}

impl OpenAiClient {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let http_client = HttpClient::builder().timeout(config.timeout()).build()?;

        Ok(Self { config, http_client })
    }

    fn completions_url(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{}/chat/completions", base)
    }
}

#[async_trait]
impl TextCompleter for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], options: CompletionOptions) -> Result<Completion> {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": 0.7
        });
        if options.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let response = self
            .http_client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DispatchError::Personalization(format!(
                "OpenAI API returned {}",
                response.status()
            )));
        }

        let result: serde_json::Value = response.json().await?;

        let content = result["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| DispatchError::Personalization("No content in OpenAI response".to_string()))?;

        Ok(Completion {
            content: content.to_string(),
        })
    }
}
