//! Shared mocks and fixtures for dispatch integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use dispatch_core::campaign::{Campaign, CampaignControl, CampaignId, MemoryStore};
use dispatch_core::clients::{DeliveryProvider, DnsError, MxRecord, MxResolver, TextCompleter};
use dispatch_core::config::{DispatchSettings, ValidatorConfig};
use dispatch_core::dispatch::{ContinuationScheduler, DispatchServices};
use dispatch_core::error::{DispatchError, Result};
use dispatch_core::services::{CredentialPool, Personalizer, RecipientValidator};
use dispatch_core::types::{ChatMessage, Completion, CompletionOptions, DeliveryReceipt, OutboundMessage};
use dispatch_types::{CreateCampaignRequest, Recipient, ResumeToken, StartRequest, Template};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded delivery attempt
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub credential: usize,
    pub message: OutboundMessage,
}

/// Delivery provider that records every message it is handed
pub struct MockProvider {
    pub slot: usize,
    pub log: Arc<Mutex<Vec<SentMessage>>>,
    pub failing: HashSet<String>,
    pub delay: Duration,
}

#[async_trait]
impl DeliveryProvider for MockProvider {
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.log.lock().unwrap().push(SentMessage {
            credential: self.slot,
            message: message.clone(),
        });
        if self.failing.contains(&message.to) {
            return Err(DispatchError::Delivery("mailbox unavailable".to_string()));
        }
        Ok(DeliveryReceipt {
            id: format!("msg-{}", message.to),
        })
    }

    fn name(&self) -> String {
        format!("mock#{}", self.slot)
    }
}

/// Resolver answering from a fixed table; unknown domains resolve fine
#[derive(Default)]
pub struct MockResolver {
    pub answers: HashMap<String, DnsError>,
    pub calls: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn with_missing_domain(domain: &str) -> Self {
        let mut answers = HashMap::new();
        answers.insert(domain.to_string(), DnsError::DomainNotFound(domain.to_string()));
        Self {
            answers,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MxResolver for MockResolver {
    async fn resolve_mx(&self, domain: &str) -> std::result::Result<Vec<MxRecord>, DnsError> {
        self.calls.lock().unwrap().push(domain.to_string());
        match self.answers.get(domain) {
            Some(err) => Err(err.clone()),
            None => Ok(vec![MxRecord {
                exchange: format!("mx.{}.", domain),
                preference: 10,
            }]),
        }
    }
}

pub struct MockCompleter {
    pub content: String,
}

#[async_trait]
impl TextCompleter for MockCompleter {
    async fn complete(&self, _messages: &[ChatMessage], _options: CompletionOptions) -> Result<Completion> {
        Ok(Completion {
            content: self.content.clone(),
        })
    }
}

/// Continuation that records tokens and fails the first `failures` attempts
pub struct MockContinuation {
    pub tokens: Mutex<Vec<ResumeToken>>,
    pub failures: Mutex<u32>,
}

impl MockContinuation {
    pub fn reliable() -> Arc<Self> {
        Self::failing(0)
    }

    pub fn failing(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            tokens: Mutex::new(Vec::new()),
            failures: Mutex::new(failures),
        })
    }
}

#[async_trait]
impl ContinuationScheduler for MockContinuation {
    async fn schedule(&self, token: &ResumeToken) -> Result<()> {
        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(DispatchError::Continuation("connection refused".to_string()));
        }
        self.tokens.lock().unwrap().push(token.clone());
        Ok(())
    }
}

pub fn test_config() -> DispatchSettings {
    let json = r#"{
        "delivery": { "api_keys": ["k0"], "timeout_secs": 2 },
        "defaults": { "defaultDomain": "default.io", "signature": "Ana" },
        "validator": { "mx_timeout_ms": 200 },
        "dispatch": {
            "log_cap": 50,
            "worker_budget_secs": 5,
            "worker_delay_ms": 0,
            "max_idle_hops": 3,
            "continuation_retries": 1,
            "claim_retries": 5
        }
    }"#;
    DispatchSettings::from_json_str(json).unwrap()
}

/// Wiring for a test: in-memory store, `pool_size` recording providers
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub services: Arc<DispatchServices>,
    pub control: CampaignControl,
    pub sent: Arc<Mutex<Vec<SentMessage>>>,
    pub resolver: Arc<MockResolver>,
}

pub struct HarnessBuilder {
    config: DispatchSettings,
    pool_size: usize,
    failing: HashSet<String>,
    delay: Duration,
    resolver: MockResolver,
    completer: Option<MockCompleter>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: test_config(),
            pool_size: 1,
            failing: HashSet::new(),
            delay: Duration::ZERO,
            resolver: MockResolver::default(),
            completer: None,
        }
    }

    pub fn pool_size(mut self, n: usize) -> Self {
        self.pool_size = n;
        self
    }

    pub fn failing(mut self, email: &str) -> Self {
        self.failing.insert(email.to_string());
        self
    }

    pub fn send_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn resolver(mut self, resolver: MockResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn completer(mut self, content: &str) -> Self {
        self.completer = Some(MockCompleter {
            content: content.to_string(),
        });
        self
    }

    pub fn configure(mut self, f: impl FnOnce(&mut DispatchSettings)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn build(self) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let sent = Arc::new(Mutex::new(Vec::new()));

        let providers: Vec<Arc<dyn DeliveryProvider>> = (0..self.pool_size)
            .map(|slot| {
                Arc::new(MockProvider {
                    slot,
                    log: sent.clone(),
                    failing: self.failing.clone(),
                    delay: self.delay,
                }) as Arc<dyn DeliveryProvider>
            })
            .collect();

        let resolver = Arc::new(self.resolver);
        let validator = RecipientValidator::from_config(
            &ValidatorConfig {
                mx_timeout_ms: 200,
                ..self.config.validator.clone()
            },
            resolver.clone(),
        );

        let personalizer = self.completer.map(|completer| {
            Arc::new(Personalizer::new(Arc::new(completer), Duration::from_millis(200)))
        });

        let services = Arc::new(DispatchServices::new(
            &self.config,
            store.clone(),
            store.clone(),
            Arc::new(validator),
            CredentialPool::new(providers),
            personalizer,
        ));

        let control = CampaignControl::new(
            store.clone(),
            store.clone(),
            self.config.defaults.clone(),
            self.config.dispatch.claim_retries,
        );

        Harness {
            store,
            services,
            control,
            sent,
            resolver,
        }
    }
}

pub fn recipients(emails: &[&str]) -> Vec<Recipient> {
    emails
        .iter()
        .map(|email| Recipient::new(*email).with_name("Sam Lee"))
        .collect()
}

pub fn start_request() -> StartRequest {
    StartRequest {
        template: Template {
            subject: "Hello {{first_name}}".to_string(),
            content: "{%Hi|Hey%} {{first_name}},\nquick question.".to_string(),
        },
        sender_name: Some("Ana".to_string()),
        rotate_domains: None,
        rotate_sender_name: None,
        domains: None,
        vary_subject: None,
        use_html: None,
        turbo_mode: None,
        agent_id: None,
    }
}

impl Harness {
    /// Create and start a campaign over `emails`
    pub async fn started(&self, emails: &[&str]) -> Campaign {
        self.started_with(emails, start_request()).await
    }

    pub async fn started_with(&self, emails: &[&str], request: StartRequest) -> Campaign {
        let campaign = self
            .control
            .create(CreateCampaignRequest {
                name: "Test campaign".to_string(),
                recipients: recipients(emails),
                template: Template::default(),
                sender_name: None,
                domains: None,
            })
            .await
            .unwrap();
        self.control.start(&campaign.id, request).await.unwrap()
    }

    pub async fn reload(&self, id: &CampaignId) -> Campaign {
        use dispatch_core::campaign::CampaignStore;
        self.store.load(id).await.unwrap()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

/// Sum of the three outcome counters
pub fn processed_count(campaign: &Campaign) -> usize {
    campaign.sent_count + campaign.skipped_count + campaign.failed_count
}
