//! Collaborators shared by the dispatch strategies

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::campaign::{Campaign, CampaignId, CampaignStore, ProgressDelta, SettingsStore};
use crate::config::{DispatchConfig, DispatchSettings};
use crate::error::{DispatchError, Result};
use crate::services::{CredentialPool, Personalizer, RecipientValidator};
use crate::types::{DeliverySettings, RunConfig};

pub struct DispatchServices {
    pub store: Arc<dyn CampaignStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub validator: Arc<RecipientValidator>,
    /// One API client per configured key
    pub api_pool: CredentialPool,
    pub personalizer: Option<Arc<Personalizer>>,
    /// Used when neither the campaign nor the settings document provide settings
    pub defaults: DeliverySettings,
    pub delivery_timeout: Duration,
    pub dispatch: DispatchConfig,
}

impl DispatchServices {
    pub fn new(
        config: &DispatchSettings,
        store: Arc<dyn CampaignStore>,
        settings: Arc<dyn SettingsStore>,
        validator: Arc<RecipientValidator>,
        api_pool: CredentialPool,
        personalizer: Option<Arc<Personalizer>>,
    ) -> Self {
        Self {
            store,
            settings,
            validator,
            api_pool,
            personalizer,
            defaults: config.defaults.clone(),
            delivery_timeout: config.delivery.timeout(),
            dispatch: config.dispatch.clone(),
        }
    }

    /// The run's settings snapshot.
    ///
    /// Campaigns started before snapshots existed get one resolved here; the
    /// flag tells the caller to attach it on its next write.
    pub async fn run_config(&self, campaign: &Campaign) -> Result<(RunConfig, bool)> {
        if let Some(run_config) = &campaign.cached_settings {
            return Ok((run_config.clone(), false));
        }

        debug!("Campaign {} has no settings snapshot, resolving one", campaign.id);
        let settings = self
            .settings
            .load_settings()
            .await?
            .unwrap_or_else(|| self.defaults.clone());
        Ok((RunConfig::capture(settings), true))
    }

    pub fn pool_for(&self, run_config: &RunConfig) -> Result<CredentialPool> {
        CredentialPool::for_settings(&run_config.settings, &self.api_pool)
    }

    /// Persist `delta` on top of `campaign`.
    ///
    /// If another writer saved in the meantime the delta is merged into the
    /// fresh record instead of overwriting it.
    pub async fn commit(&self, mut campaign: Campaign, delta: &ProgressDelta) -> Result<Campaign> {
        if !campaign.apply_delta(delta, self.dispatch.log_cap) {
            return self.merge(&campaign.id, delta, false).await;
        }

        match self.store.save(&campaign).await {
            Ok(saved) => Ok(saved),
            Err(DispatchError::Conflict(msg)) => {
                warn!("Campaign {} changed during processing ({}), merging progress", campaign.id, msg);
                self.merge(&campaign.id, delta, false).await
            }
            Err(e) => Err(e),
        }
    }

    /// Fold `delta` into the stored record, reloading on version conflicts.
    ///
    /// A record that was reset since the delta's recipients were taken is
    /// returned unchanged. With `complete` set the campaign is marked
    /// completed once the cursor reaches the end.
    pub async fn merge(&self, id: &CampaignId, delta: &ProgressDelta, complete: bool) -> Result<Campaign> {
        let attempts = self.dispatch.claim_retries.max(1);
        let mut last_conflict = String::new();

        for attempt in 1..=attempts {
            let mut campaign = self.store.load(id).await?;
            if !campaign.apply_delta(delta, self.dispatch.log_cap) {
                warn!(
                    "Campaign {} was reset during processing (run {} -> {}), discarding {} outcome(s)",
                    id,
                    delta.run,
                    campaign.run,
                    delta.logs.len()
                );
                return Ok(campaign);
            }
            if complete {
                campaign.complete_if_exhausted();
            }

            match self.store.save(&campaign).await {
                Ok(saved) => return Ok(saved),
                Err(DispatchError::Conflict(msg)) => {
                    debug!("Merge into campaign {} conflicted (attempt {}/{}): {}", id, attempt, attempts, msg);
                    last_conflict = msg;
                }
                Err(e) => return Err(e),
            }
        }

        warn!("Giving up merging into campaign {} after {} conflicting writes", id, attempts);
        Err(DispatchError::Conflict(last_conflict))
    }
}
