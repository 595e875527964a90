//! Ordered pool of sending credentials

use log::info;
use std::sync::{Arc, Mutex};

use crate::clients::{ApiDeliveryClient, DeliveryProvider, SmtpDeliveryClient};
use crate::config::DeliveryConfig;
use crate::error::{DispatchError, Result};
use crate::types::{DeliverySettings, ProviderKind};

struct PoolInner {
    providers: Vec<Arc<dyn DeliveryProvider>>,
    cursor: Mutex<usize>,
}

/// Fixed, ordered set of delivery providers, one per credential.
///
/// Cheap to clone; clones share the round-robin cursor.
#[derive(Clone)]
pub struct CredentialPool {
    inner: Arc<PoolInner>,
}

impl CredentialPool {
    pub fn new(providers: Vec<Arc<dyn DeliveryProvider>>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                providers,
                cursor: Mutex::new(0),
            }),
        }
    }

    /// One API client per provisioned key, in configured order
    pub fn from_api_keys(config: &DeliveryConfig) -> Result<Self> {
        let providers = config
            .api_keys
            .iter()
            .filter(|key| !key.trim().is_empty())
            .enumerate()
            .map(|(slot, key)| {
                ApiDeliveryClient::new(&config.api_base_url, key.clone(), slot, config.timeout())
                    .map(|client| Arc::new(client) as Arc<dyn DeliveryProvider>)
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Credential pool assembled with {} API key(s)", providers.len());
        Ok(Self::new(providers))
    }

    /// Pool matching the provider a run was started with
    pub fn for_settings(settings: &DeliverySettings, api_pool: &CredentialPool) -> Result<Self> {
        match settings.provider {
            ProviderKind::Api => Ok(api_pool.clone()),
            ProviderKind::Smtp => {
                let smtp = settings.smtp.as_ref().ok_or_else(|| {
                    DispatchError::Config("SMTP provider selected without SMTP credentials".to_string())
                })?;
                let client = SmtpDeliveryClient::new(smtp)?;
                Ok(Self::new(vec![Arc::new(client)]))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.providers.is_empty()
    }

    fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(DispatchError::Config("No delivery credentials configured".to_string()));
        }
        Ok(())
    }

    /// Round-robin pick; only meaningful inside one process
    pub fn next(&self) -> Result<Arc<dyn DeliveryProvider>> {
        self.ensure_not_empty()?;
        let mut cursor = self
            .inner
            .cursor
            .lock()
            .map_err(|_| DispatchError::Config("Credential pool cursor poisoned".to_string()))?;
        let provider = self.inner.providers[*cursor % self.len()].clone();
        *cursor = (*cursor + 1) % self.len();
        Ok(provider)
    }

    /// Deterministic pick: `pool[index mod len]`
    pub fn by_index(&self, index: usize) -> Result<Arc<dyn DeliveryProvider>> {
        self.ensure_not_empty()?;
        Ok(self.inner.providers[index % self.len()].clone())
    }
}
