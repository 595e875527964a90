//! Turbo dispatcher: claim a pool-sized batch, send it in parallel
//!
//! The claim is persisted before anything is sent, so overlapping callers
//! never pick up the same recipients. Recipient `i` (global position) is
//! always sent with credential `i mod pool_size`.

use dispatch_types::{BatchResponse, CampaignStatus, StepStatus};
use futures::future::join_all;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;

use super::context::DispatchServices;
use crate::campaign::{update_with_retry, Campaign, CampaignId, LogEntry, ProgressDelta};
use crate::error::{DispatchError, Result};
use crate::services::{build_message, render_draft, resolve_sender};
use crate::types::OutboundMessage;

fn batch_response(campaign: &Campaign, batch: usize, sent: usize, failed: usize, started: Instant) -> BatchResponse {
    let elapsed = started.elapsed();
    let secs = elapsed.as_secs_f64();
    BatchResponse {
        status: campaign.status,
        batch,
        sent,
        failed,
        current_index: campaign.current_index,
        sent_count: campaign.sent_count,
        total: campaign.total(),
        elapsed: elapsed.as_millis() as u64,
        speed: if batch > 0 && secs > 0.0 { batch as f64 / secs } else { 0.0 },
    }
}

/// Cursor range reserved by a successful claim
struct Claim {
    campaign: Campaign,
    start: usize,
    size: usize,
}

pub struct TurboDispatcher {
    services: Arc<DispatchServices>,
}

impl TurboDispatcher {
    pub fn new(services: Arc<DispatchServices>) -> Self {
        Self { services }
    }

    /// Reserve the next batch; `Err(campaign)` when there is nothing to claim
    async fn claim(&self, id: &CampaignId, pool_size: usize) -> Result<std::result::Result<Claim, Campaign>> {
        let services = &self.services;
        let attempts = services.dispatch.claim_retries.max(1);

        for attempt in 1..=attempts {
            let mut campaign = services.store.load(id).await?;
            if campaign.status != CampaignStatus::Processing || campaign.is_exhausted() {
                return Ok(Err(campaign));
            }

            let start = campaign.current_index;
            let size = pool_size.min(campaign.remaining());
            campaign.current_index = start + size;

            if campaign.cached_settings.is_none() {
                let (run_config, _) = services.run_config(&campaign).await?;
                campaign.cached_settings = Some(run_config);
            }

            match services.store.save(&campaign).await {
                Ok(saved) => {
                    return Ok(Ok(Claim {
                        campaign: saved,
                        start,
                        size,
                    }))
                }
                Err(DispatchError::Conflict(msg)) => {
                    debug!("Claim on campaign {} lost a race (attempt {}/{}): {}", id, attempt, attempts, msg);
                }
                Err(e) => return Err(e),
            }
        }

        warn!("Could not claim a batch on campaign {} after {} attempts", id, attempts);
        Err(DispatchError::Conflict(format!("campaign {} is contended", id)))
    }

    pub async fn dispatch_batch(&self, id: &CampaignId) -> Result<BatchResponse> {
        let started = Instant::now();
        let services = &self.services;

        let campaign = services.store.load(id).await?;
        if campaign.status != CampaignStatus::Processing {
            debug!("Campaign {} is {}, nothing to dispatch", id, campaign.status);
            return Ok(batch_response(&campaign, 0, 0, 0, started));
        }

        let (run_config, _) = services.run_config(&campaign).await?;
        let pool = services.pool_for(&run_config)?;
        if pool.is_empty() {
            return Err(DispatchError::Config("No delivery credentials configured".to_string()));
        }

        let claim = match self.claim(id, pool.len()).await? {
            Ok(claim) => claim,
            Err(campaign) if campaign.status == CampaignStatus::Processing => {
                let saved = update_with_retry(services.store.as_ref(), id, services.dispatch.claim_retries, |c| {
                    c.complete_if_exhausted();
                    Ok(())
                })
                .await?;
                info!("Campaign {} completed ({} sent)", id, saved.sent_count);
                return Ok(batch_response(&saved, 0, 0, 0, started));
            }
            Err(campaign) => return Ok(batch_response(&campaign, 0, 0, 0, started)),
        };

        let Claim { campaign, start, size } = claim;
        let settings = campaign
            .cached_settings
            .as_ref()
            .map(|rc| rc.settings.clone())
            .unwrap_or_else(|| run_config.settings.clone());
        info!("Dispatching batch {}..{} of campaign {} over {} credential(s)", start, start + size, id, pool.len());

        let messages: Vec<(usize, OutboundMessage)> = {
            let mut rng = rand::rng();
            campaign.recipients[start..start + size]
                .iter()
                .enumerate()
                .map(|(offset, recipient)| {
                    let index = start + offset;
                    let sender = resolve_sender(&campaign, &settings, index, &mut rng);
                    let draft = render_draft(&campaign, recipient, &mut rng);
                    let message =
                        build_message(&sender, recipient, draft, campaign.use_html, settings.signature.as_deref());
                    (index, message)
                })
                .collect()
        };

        let timeout = services.delivery_timeout;
        let sends = messages.into_iter().map(|(index, message)| {
            let provider = pool.by_index(index);
            async move {
                let provider = match provider {
                    Ok(provider) => provider,
                    Err(e) => return LogEntry::new(index, &message.to, StepStatus::Failed, e.to_string()),
                };
                match tokio::time::timeout(timeout, provider.send(&message)).await {
                    Ok(Ok(receipt)) => LogEntry::new(
                        index,
                        &message.to,
                        StepStatus::Sent,
                        format!("Sent via {} ({})", provider.name(), receipt.id),
                    ),
                    Ok(Err(e)) => LogEntry::new(index, &message.to, StepStatus::Failed, format!("Delivery failed: {}", e)),
                    Err(_) => LogEntry::new(
                        index,
                        &message.to,
                        StepStatus::Failed,
                        format!("Delivery timed out after {:?}", timeout),
                    ),
                }
            }
        });
        let outcomes = join_all(sends).await;

        let mut delta = ProgressDelta::at(campaign.run, start + size);
        for entry in outcomes {
            delta.record(entry);
        }
        let (sent, failed) = (delta.sent, delta.failed);

        let saved = services.merge(id, &delta, true).await?;

        let response = batch_response(&saved, size, sent, failed, started);
        info!(
            "Batch of campaign {}: {} sent, {} failed, cursor {}/{}, {:.1} msg/s",
            id, sent, failed, saved.current_index, saved.total(), response.speed
        );
        Ok(response)
    }
}
