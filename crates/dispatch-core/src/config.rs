//! Configuration management for the dispatch engine

use crate::error::{DispatchError, Result};
use crate::types::{DeliverySettings, ProviderKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Raw configuration structure matching config.json exactly
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    pub delivery: RawDeliveryConfig,

    /// Seed for the shared settings document
    pub defaults: DeliverySettings,

    #[serde(default)]
    pub openai: Option<OpenAIConfig>,

    #[serde(default)]
    pub validator: ValidatorConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Deserialize)]
struct RawDeliveryConfig {
    #[serde(alias = "base_url", alias = "api_url", default = "default_api_base_url")]
    pub api_base_url: String,

    /// Slots may be null or empty when a credential is not provisioned
    #[serde(default)]
    pub api_keys: Vec<Option<String>>,

    #[serde(default = "default_delivery_timeout_secs")]
    pub timeout_secs: u64,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub delivery: DeliveryConfig,
    pub defaults: DeliverySettings,
    pub openai: Option<OpenAIConfig>,
    pub validator: ValidatorConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL the worker uses to reach this service for continuations
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
        }
    }
}

impl ServerConfig {
    pub fn self_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://127.0.0.1:{}", self.port),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(alias = "data_root", default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub api_base_url: String,
    /// Provisioned credentials only, in configured order
    pub api_keys: Vec<String>,
    pub timeout_secs: u64,
}

impl DeliveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: String,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_personalization_timeout_secs")]
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredicateWeights {
    #[serde(default = "default_weight")]
    pub syntax: f64,
    #[serde(default = "default_weight")]
    pub generic_address: f64,
    #[serde(default = "default_weight")]
    pub mx_record: f64,
}

impl Default for PredicateWeights {
    fn default() -> Self {
        Self {
            syntax: default_weight(),
            generic_address: default_weight(),
            mx_record: default_weight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default = "default_blacklist")]
    pub blacklist: Vec<String>,

    #[serde(default = "default_mx_timeout_ms")]
    pub mx_timeout_ms: u64,

    #[serde(default = "default_mx_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default)]
    pub weights: PredicateWeights,

    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            blacklist: default_blacklist(),
            mx_timeout_ms: default_mx_timeout_ms(),
            cache_ttl_secs: default_mx_cache_ttl_secs(),
            weights: PredicateWeights::default(),
            threshold: default_threshold(),
        }
    }
}

impl ValidatorConfig {
    pub fn mx_timeout(&self) -> Duration {
        Duration::from_millis(self.mx_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Capacity of the per-campaign log ring buffer
    #[serde(default = "default_log_cap")]
    pub log_cap: usize,

    /// Wall-clock budget of one worker hop
    #[serde(default = "default_worker_budget_secs")]
    pub worker_budget_secs: u64,

    /// Pause between two recipients inside a worker hop
    #[serde(default = "default_worker_delay_ms")]
    pub worker_delay_ms: u64,

    /// Consecutive worker hops without cursor movement before the chain is abandoned
    #[serde(default = "default_max_idle_hops")]
    pub max_idle_hops: u32,

    #[serde(default = "default_continuation_retries")]
    pub continuation_retries: u32,

    /// Attempts at a versioned write before giving up
    #[serde(default = "default_claim_retries")]
    pub claim_retries: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            log_cap: default_log_cap(),
            worker_budget_secs: default_worker_budget_secs(),
            worker_delay_ms: default_worker_delay_ms(),
            max_idle_hops: default_max_idle_hops(),
            continuation_retries: default_continuation_retries(),
            claim_retries: default_claim_retries(),
        }
    }
}

impl DispatchConfig {
    pub fn worker_budget(&self) -> Duration {
        Duration::from_secs(self.worker_budget_secs)
    }

    pub fn worker_delay(&self) -> Duration {
        Duration::from_millis(self.worker_delay_ms)
    }
}

// Default functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    crate::paths::DEFAULT_DATA_ROOT.to_string()
}

fn default_api_base_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_delivery_timeout_secs() -> u64 {
    30
}

fn default_personalization_timeout_secs() -> u64 {
    8
}

fn default_weight() -> f64 {
    1.0
}

fn default_threshold() -> f64 {
    1.0
}

fn default_blacklist() -> Vec<String> {
    crate::constants::GENERIC_LOCAL_PARTS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_mx_timeout_ms() -> u64 {
    3000
}

fn default_mx_cache_ttl_secs() -> u64 {
    600
}

fn default_log_cap() -> usize {
    50
}

fn default_worker_budget_secs() -> u64 {
    50
}

fn default_worker_delay_ms() -> u64 {
    1000
}

fn default_max_idle_hops() -> u32 {
    5
}

fn default_continuation_retries() -> u32 {
    3
}

fn default_claim_retries() -> u32 {
    5
}

impl DispatchSettings {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DispatchError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_json_str(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw_config: RawConfig = serde_json::from_str(json)
            .map_err(|e| DispatchError::Config(format!("Failed to parse config: {}", e)))?;

        let config = Self::from_raw_config(raw_config);
        config.validate()?;
        Ok(config)
    }

    /// Drop unprovisioned credential slots, keeping the order of the rest
    fn from_raw_config(raw: RawConfig) -> Self {
        let api_keys = raw
            .delivery
            .api_keys
            .into_iter()
            .flatten()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();

        Self {
            server: raw.server,
            storage: raw.storage,
            delivery: DeliveryConfig {
                api_base_url: raw.delivery.api_base_url.trim_end_matches('/').to_string(),
                api_keys,
                timeout_secs: raw.delivery.timeout_secs,
            },
            defaults: raw.defaults,
            openai: raw.openai,
            validator: raw.validator,
            dispatch: raw.dispatch,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.defaults.default_domain.trim().is_empty() {
            return Err(DispatchError::Config("defaults.defaultDomain is required".to_string()));
        }

        match self.defaults.provider {
            ProviderKind::Api if self.delivery.api_keys.is_empty() => {
                return Err(DispatchError::Config(
                    "API delivery needs at least one entry in delivery.api_keys".to_string(),
                ));
            }
            ProviderKind::Smtp if self.defaults.smtp.is_none() => {
                return Err(DispatchError::Config(
                    "SMTP delivery needs defaults.smtp credentials".to_string(),
                ));
            }
            _ => {}
        }

        if let Some(openai) = &self.openai {
            if openai.api_key.is_empty() {
                return Err(DispatchError::Config("OpenAI API key is required when openai is configured".to_string()));
            }
        }

        if self.validator.threshold <= 0.0 {
            return Err(DispatchError::Config("validator.threshold must be positive".to_string()));
        }

        if self.delivery.timeout_secs == 0 {
            return Err(DispatchError::Config("delivery.timeout_secs must be at least 1".to_string()));
        }

        if self.dispatch.log_cap == 0 {
            return Err(DispatchError::Config("dispatch.log_cap must be at least 1".to_string()));
        }

        if self.dispatch.worker_budget_secs == 0 {
            return Err(DispatchError::Config("dispatch.worker_budget_secs must be at least 1".to_string()));
        }

        if self.dispatch.max_idle_hops == 0 {
            return Err(DispatchError::Config("dispatch.max_idle_hops must be at least 1".to_string()));
        }

        Ok(())
    }
}
