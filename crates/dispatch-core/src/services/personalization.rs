//! Optional LLM rewrite of a rendered draft
//!
//! Personalization never fails a send: on timeout, provider error or an
//! unusable answer the caller keeps the template draft.

use dispatch_types::{Recipient, Template};
use log::{debug, warn};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::clients::TextCompleter;
use crate::error::{DispatchError, Result};
use crate::types::{Agent, ChatMessage, CompletionOptions};

#[derive(Debug, Deserialize)]
struct PersonalizedDraft {
    subject: String,
    content: String,
}

pub struct Personalizer {
    completer: Arc<dyn TextCompleter>,
    timeout: Duration,
}

impl Personalizer {
    pub fn new(completer: Arc<dyn TextCompleter>, timeout: Duration) -> Self {
        Self { completer, timeout }
    }

    fn build_messages(agent: &Agent, recipient: &Recipient, draft: &Template) -> Vec<ChatMessage> {
        let system = format!(
            "{}\n\nRewrite the email for the recipient below. Answer with a JSON object \
             {{\"subject\": string, \"content\": string}} and nothing else.",
            agent.instructions
        );

        let user = format!(
            "Recipient:\n\
            Name: {}\n\
            Email: {}\n\
            Company: {}\n\
            Title: {}\n\
            \n\
            Subject: {}\n\
            \n\
            {}",
            recipient.name.as_deref().unwrap_or("Unknown"),
            recipient.email,
            recipient.company.as_deref().unwrap_or("Unknown"),
            recipient.title.as_deref().unwrap_or("Unknown"),
            draft.subject,
            draft.content
        );

        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }

    fn parse_completion(content: &str) -> Result<Template> {
        let trimmed = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let parsed: PersonalizedDraft = serde_json::from_str(trimmed)
            .map_err(|e| DispatchError::Personalization(format!("Unusable completion: {}", e)))?;

        if parsed.subject.trim().is_empty() || parsed.content.trim().is_empty() {
            return Err(DispatchError::Personalization("Completion left subject or content empty".to_string()));
        }

        Ok(Template {
            subject: parsed.subject,
            content: parsed.content,
        })
    }

    /// Rewritten draft, or `None` when the template draft should be used
    pub async fn personalize(&self, agent: &Agent, recipient: &Recipient, draft: &Template) -> Option<Template> {
        let messages = Self::build_messages(agent, recipient, draft);
        let call = self.completer.complete(&messages, CompletionOptions { json_mode: true });

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(completion)) => match Self::parse_completion(&completion.content) {
                Ok(template) => {
                    debug!("Personalized message for {} with agent {}", recipient.email, agent.id);
                    Some(template)
                }
                Err(e) => {
                    warn!("Ignoring personalization for {}: {}", recipient.email, e);
                    None
                }
            },
            Ok(Err(e)) => {
                warn!("Personalization failed for {}: {}", recipient.email, e);
                None
            }
            Err(_) => {
                warn!("Personalization for {} timed out after {:?}", recipient.email, self.timeout);
                None
            }
        }
    }
}
