//! Campaign lifecycle transitions
//!
//! ```text
//! draft --start--> processing --pause--> paused --resume--> processing
//! {draft, paused, completed} --reset--> draft
//! processing --(cursor reaches end)--> completed
//! ```

use dispatch_types::{
    CampaignStatus, CreateCampaignRequest, Recipient, ResumeRequest, StartRequest,
};
use log::info;
use std::collections::HashSet;
use std::sync::Arc;

use super::store::{update_with_retry, CampaignStore, SettingsStore};
use super::types::{Campaign, CampaignId, CampaignSummary};
use crate::error::{DispatchError, Result};
use crate::types::{DeliverySettings, RunConfig};

pub struct CampaignControl {
    store: Arc<dyn CampaignStore>,
    settings: Arc<dyn SettingsStore>,
    defaults: DeliverySettings,
    write_attempts: u32,
}

fn transition_error(action: &str, campaign: &Campaign) -> DispatchError {
    DispatchError::InvalidTransition(format!(
        "cannot {} campaign {} while it is {}",
        action, campaign.id, campaign.status
    ))
}

/// Drop blank addresses and case-insensitive duplicates, keeping the first
fn clean_recipients(recipients: Vec<Recipient>) -> Vec<Recipient> {
    let mut seen = HashSet::new();
    recipients
        .into_iter()
        .filter_map(|mut r| {
            r.email = r.email.trim().to_string();
            if r.email.is_empty() || !seen.insert(r.email.to_ascii_lowercase()) {
                return None;
            }
            Some(r)
        })
        .collect()
}

impl CampaignControl {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        settings: Arc<dyn SettingsStore>,
        defaults: DeliverySettings,
        write_attempts: u32,
    ) -> Self {
        Self {
            store,
            settings,
            defaults,
            write_attempts,
        }
    }

    pub async fn create(&self, request: CreateCampaignRequest) -> Result<Campaign> {
        if request.name.trim().is_empty() {
            return Err(DispatchError::InvalidRequest("Campaign name is required".to_string()));
        }

        let submitted = request.recipients.len();
        let recipients = clean_recipients(request.recipients);

        let mut campaign = Campaign::new(request.name.trim(), recipients, request.template);
        if let Some(sender_name) = request.sender_name {
            campaign.sender_name = sender_name;
        }
        if let Some(domains) = request.domains {
            campaign.domains = domains;
        }

        let stored = self.store.insert(&campaign).await?;
        info!(
            "Created campaign {} '{}' with {} recipient(s) ({} dropped)",
            stored.id,
            stored.name,
            stored.total(),
            submitted - stored.total()
        );
        Ok(stored)
    }

    pub async fn get(&self, id: &CampaignId) -> Result<Campaign> {
        self.store.load(id).await
    }

    pub async fn list(&self) -> Result<Vec<CampaignSummary>> {
        Ok(self.store.list().await?.iter().map(Campaign::summary).collect())
    }

    /// Settings snapshot for a new run; the config defaults stand in for a missing document
    async fn capture_settings(&self) -> Result<RunConfig> {
        let settings = self
            .settings
            .load_settings()
            .await?
            .unwrap_or_else(|| self.defaults.clone());
        Ok(RunConfig::capture(settings))
    }

    pub async fn start(&self, id: &CampaignId, request: StartRequest) -> Result<Campaign> {
        if request.template.content.trim().is_empty() {
            return Err(DispatchError::InvalidRequest("Template content is required".to_string()));
        }

        let run_config = self.capture_settings().await?;

        let campaign = update_with_retry(self.store.as_ref(), id, self.write_attempts, |campaign| {
            if campaign.status != CampaignStatus::Draft {
                return Err(transition_error("start", campaign));
            }

            campaign.reset_progress();
            campaign.status = CampaignStatus::Processing;
            campaign.template = request.template.clone();
            campaign.cached_settings = Some(run_config.clone());

            if let Some(sender_name) = &request.sender_name {
                campaign.sender_name = sender_name.clone();
            }
            if let Some(domains) = &request.domains {
                campaign.domains = domains.clone();
            }
            if let Some(flag) = request.rotate_domains {
                campaign.rotate_domains = flag;
            }
            if let Some(flag) = request.rotate_sender_name {
                campaign.rotate_sender_name = flag;
            }
            if let Some(flag) = request.vary_subject {
                campaign.vary_subject = flag;
            }
            if let Some(flag) = request.use_html {
                campaign.use_html = flag;
            }
            if let Some(flag) = request.turbo_mode {
                campaign.turbo_mode = flag;
            }
            if request.agent_id.is_some() {
                campaign.agent_id = request.agent_id.clone();
            }
            Ok(())
        })
        .await?;

        info!("Started campaign {} with {} recipient(s)", campaign.id, campaign.total());
        Ok(campaign)
    }

    pub async fn pause(&self, id: &CampaignId) -> Result<Campaign> {
        let campaign = update_with_retry(self.store.as_ref(), id, self.write_attempts, |campaign| {
            if campaign.status != CampaignStatus::Processing {
                return Err(transition_error("pause", campaign));
            }
            campaign.status = CampaignStatus::Paused;
            Ok(())
        })
        .await?;

        info!("Paused campaign {} at {}/{}", campaign.id, campaign.current_index, campaign.total());
        Ok(campaign)
    }

    pub async fn resume(&self, id: &CampaignId, request: ResumeRequest) -> Result<Campaign> {
        let campaign = update_with_retry(self.store.as_ref(), id, self.write_attempts, |campaign| {
            if campaign.status != CampaignStatus::Paused {
                return Err(transition_error("resume", campaign));
            }
            campaign.status = CampaignStatus::Processing;
            if let Some(template) = &request.template {
                campaign.template = template.clone();
            }
            Ok(())
        })
        .await?;

        info!("Resumed campaign {} at {}/{}", campaign.id, campaign.current_index, campaign.total());
        Ok(campaign)
    }

    pub async fn reset(&self, id: &CampaignId) -> Result<Campaign> {
        let campaign = update_with_retry(self.store.as_ref(), id, self.write_attempts, |campaign| {
            if campaign.status == CampaignStatus::Processing {
                return Err(transition_error("reset", campaign));
            }
            campaign.reset_progress();
            campaign.status = CampaignStatus::Draft;
            Ok(())
        })
        .await?;

        info!("Reset campaign {} to draft", campaign.id);
        Ok(campaign)
    }
}
