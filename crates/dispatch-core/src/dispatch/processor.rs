//! Single-step processor: one recipient per call

use dispatch_types::{CampaignStatus, ProcessResponse, StepStatus};
use log::{debug, info, warn};
use std::sync::Arc;

use super::context::DispatchServices;
use crate::campaign::{update_with_retry, Campaign, CampaignId, LogEntry, ProgressDelta};
use crate::error::Result;
use crate::services::{build_message, render_draft, resolve_sender};

fn response(campaign: &Campaign, status: StepStatus, recipient: Option<String>, reason: Option<String>) -> ProcessResponse {
    ProcessResponse {
        status,
        recipient,
        current_index: campaign.current_index,
        sent_count: campaign.sent_count,
        total: campaign.total(),
        reason,
    }
}

#[derive(Clone)]
pub struct SingleStepProcessor {
    services: Arc<DispatchServices>,
}

impl SingleStepProcessor {
    pub fn new(services: Arc<DispatchServices>) -> Self {
        Self { services }
    }

    /// Advance the campaign by exactly one recipient.
    ///
    /// With `turbo` set the validator and personalization are bypassed.
    pub async fn process(&self, id: &CampaignId, turbo: bool) -> Result<ProcessResponse> {
        let services = &self.services;
        let campaign = services.store.load(id).await?;

        if campaign.status != CampaignStatus::Processing {
            debug!("Campaign {} is {}, nothing to process", id, campaign.status);
            return Ok(response(&campaign, campaign.status.into(), None, None));
        }

        if campaign.is_exhausted() {
            let saved = update_with_retry(services.store.as_ref(), id, services.dispatch.claim_retries, |c| {
                c.complete_if_exhausted();
                Ok(())
            })
            .await?;
            info!("Campaign {} completed ({} sent)", id, saved.sent_count);
            return Ok(response(&saved, saved.status.into(), None, None));
        }

        let index = campaign.current_index;
        let recipient = campaign.recipients[index].clone();

        let (run_config, resolved) = services.run_config(&campaign).await?;
        let provider = services.pool_for(&run_config)?.next()?;

        let mut delta = ProgressDelta::at(campaign.run, index + 1);
        if resolved {
            delta.run_config = Some(run_config.clone());
        }

        let (sender, mut draft) = {
            let mut rng = rand::rng();
            let sender = resolve_sender(&campaign, &run_config.settings, index, &mut rng);
            let draft = render_draft(&campaign, &recipient, &mut rng);
            (sender, draft)
        };

        if !turbo {
            let outcome = services.validator.validate(&recipient.email).await;
            if outcome.skip {
                let reason = outcome.reason().unwrap_or_else(|| "rejected by validator".to_string());
                delta.record(LogEntry::new(
                    index,
                    &recipient.email,
                    StepStatus::Skipped,
                    format!("Skipped: {}", reason),
                ));
                let saved = services.commit(campaign, &delta).await?;
                info!("Skipped {} ({}/{}): {}", recipient.email, saved.current_index, saved.total(), reason);
                return Ok(response(&saved, StepStatus::Skipped, Some(recipient.email), Some(reason)));
            }
        }

        if let (false, Some(agent_id), Some(personalizer)) =
            (turbo, campaign.agent_id.as_deref(), services.personalizer.as_ref())
        {
            match services.settings.load_agent(agent_id).await {
                Ok(Some(agent)) => {
                    if let Some(personalized) = personalizer.personalize(&agent, &recipient, &draft).await {
                        draft = personalized;
                    }
                }
                Ok(None) => warn!("Agent {} not found, sending template content", agent_id),
                Err(e) => warn!("Could not load agent {}: {}", agent_id, e),
            }
        }

        let message = build_message(
            &sender,
            &recipient,
            draft,
            campaign.use_html,
            run_config.settings.signature.as_deref(),
        );

        let timeout = services.delivery_timeout;
        let (status, note) = match tokio::time::timeout(timeout, provider.send(&message)).await {
            Ok(Ok(receipt)) => (StepStatus::Sent, format!("Sent via {} ({})", provider.name(), receipt.id)),
            Ok(Err(e)) => (StepStatus::Failed, format!("Delivery failed: {}", e)),
            Err(_) => (StepStatus::Failed, format!("Delivery timed out after {:?}", timeout)),
        };

        delta.record(LogEntry::new(index, &recipient.email, status, note.clone()));
        let saved = services.commit(campaign, &delta).await?;

        match status {
            StepStatus::Sent => info!("Sent to {} ({}/{})", recipient.email, saved.current_index, saved.total()),
            _ => warn!("Failed {} ({}/{}): {}", recipient.email, saved.current_index, saved.total(), note),
        }

        let reason = (status == StepStatus::Failed).then_some(note);
        Ok(response(&saved, status, Some(recipient.email), reason))
    }
}
