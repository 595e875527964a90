//! Common types used throughout the dispatch engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which delivery path a campaign uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Api,
    Smtp,
}

/// SMTP relay credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtpSettings {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default = "default_smtp_tls")]
    pub tls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_tls() -> bool {
    true
}

/// Shared delivery configuration, stored as the `settings` document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySettings {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Local part of the From address, e.g. `hello` in `hello@example.com`
    #[serde(alias = "fromUser", default = "default_from_local_part")]
    pub from_local_part: String,

    pub default_domain: String,

    #[serde(default)]
    pub signature: Option<String>,

    #[serde(default)]
    pub smtp: Option<SmtpSettings>,
}

fn default_from_local_part() -> String {
    "hello".to_string()
}

impl DeliverySettings {
    pub fn new(default_domain: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Api,
            from_local_part: default_from_local_part(),
            default_domain: default_domain.into(),
            signature: None,
            smtp: None,
        }
    }
}

/// Settings snapshot taken when a campaign starts.
///
/// Never re-derived from the shared settings document while the run lasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub settings: DeliverySettings,
    pub captured_at: DateTime<Utc>,
}

impl RunConfig {
    pub fn capture(settings: DeliverySettings) -> Self {
        Self {
            settings,
            captured_at: Utc::now(),
        }
    }
}

/// Persona attached to a campaign for LLM personalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub instructions: String,
}

/// A fully rendered message ready for a delivery provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Provider acknowledgement for an accepted message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub id: String,
}

/// One turn of a chat-completion conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionOptions {
    pub json_mode: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
}
