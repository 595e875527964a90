//! In-process store used by tests and single-node demos

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::store::{CampaignStore, SettingsStore};
use super::types::{Campaign, CampaignId};
use crate::error::{DispatchError, Result};
use crate::types::{Agent, DeliverySettings};

#[derive(Default)]
pub struct MemoryStore {
    campaigns: RwLock<HashMap<CampaignId, Campaign>>,
    settings: RwLock<Option<DeliverySettings>>,
    agents: RwLock<HashMap<String, Agent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: DeliverySettings) -> Self {
        Self {
            settings: RwLock::new(Some(settings)),
            ..Self::default()
        }
    }

    pub async fn save_agent(&self, agent: Agent) {
        self.agents.write().await.insert(agent.id.clone(), agent);
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn load(&self, id: &CampaignId) -> Result<Campaign> {
        self.campaigns
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| DispatchError::NotFound(format!("Campaign {} not found", id)))
    }

    async fn list(&self) -> Result<Vec<Campaign>> {
        let mut campaigns: Vec<Campaign> = self.campaigns.read().await.values().cloned().collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(campaigns)
    }

    async fn insert(&self, campaign: &Campaign) -> Result<Campaign> {
        let mut campaigns = self.campaigns.write().await;
        if campaigns.contains_key(&campaign.id) {
            return Err(DispatchError::Conflict(format!("Campaign {} already exists", campaign.id)));
        }

        let mut stored = campaign.clone();
        stored.version = 1;
        stored.updated_at = Utc::now();
        campaigns.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn save(&self, campaign: &Campaign) -> Result<Campaign> {
        let mut campaigns = self.campaigns.write().await;
        let current = campaigns
            .get(&campaign.id)
            .ok_or_else(|| DispatchError::NotFound(format!("Campaign {} not found", campaign.id)))?;

        if current.version != campaign.version {
            return Err(DispatchError::Conflict(format!(
                "campaign {} is at version {}, write was based on {}",
                campaign.id, current.version, campaign.version
            )));
        }

        let mut stored = campaign.clone();
        stored.version = current.version + 1;
        stored.updated_at = Utc::now();
        campaigns.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load_settings(&self) -> Result<Option<DeliverySettings>> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_settings(&self, settings: &DeliverySettings) -> Result<()> {
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }

    async fn load_agent(&self, id: &str) -> Result<Option<Agent>> {
        Ok(self.agents.read().await.get(id).cloned())
    }
}
