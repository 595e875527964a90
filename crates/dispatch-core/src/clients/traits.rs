//! Collaborator traits for the external services the engine talks to
//!
//! Each capability is a narrow async trait so strategies can be tested
//! against in-memory mocks.

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{ChatMessage, Completion, CompletionOptions, DeliveryReceipt, OutboundMessage};
use super::dns::{DnsError, MxRecord};

/// Send-one-message capability
#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    /// Hand one rendered message to the upstream provider
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt>;

    /// Short label for logs, never the credential itself
    fn name(&self) -> String;
}

/// Text-generation capability used for optional per-recipient personalization
#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], options: CompletionOptions) -> Result<Completion>;
}

/// MX resolution with a distinguishable not-found kind
#[async_trait]
pub trait MxResolver: Send + Sync {
    async fn resolve_mx(&self, domain: &str) -> std::result::Result<Vec<MxRecord>, DnsError>;
}
