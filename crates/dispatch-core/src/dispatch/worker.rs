//! Continuous worker: single steps inside a time budget, then a continuation

use chrono::Utc;
use dispatch_types::{CampaignStatus, ContinuationStatus, ResumeToken, WorkerRequest, WorkerSummary};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::context::DispatchServices;
use super::continuation::ContinuationScheduler;
use super::processor::SingleStepProcessor;
use crate::campaign::{Campaign, CampaignId};
use crate::constants::CONTINUATION_BACKOFF_MS;
use crate::error::{DispatchError, Result};

#[derive(Clone)]
pub struct ContinuousWorker {
    services: Arc<DispatchServices>,
    processor: SingleStepProcessor,
    continuation: Arc<dyn ContinuationScheduler>,
}

impl ContinuousWorker {
    pub fn new(services: Arc<DispatchServices>, continuation: Arc<dyn ContinuationScheduler>) -> Self {
        Self {
            processor: SingleStepProcessor::new(services.clone()),
            services,
            continuation,
        }
    }

    /// Run one hop for the campaign named in `request`
    pub async fn run(&self, request: &WorkerRequest) -> Result<WorkerSummary> {
        let id = CampaignId::from_string(&request.campaign_id).map_err(DispatchError::InvalidRequest)?;
        let (hop, idle_hops) = match &request.resume_token {
            Some(token) if token.campaign_id != id.as_str() => {
                return Err(DispatchError::InvalidRequest(format!(
                    "resume token belongs to campaign {}",
                    token.campaign_id
                )));
            }
            Some(token) => (token.hop, token.idle_hops),
            None => (0, 0),
        };

        let started = Instant::now();
        let budget = self.services.dispatch.worker_budget();
        let delay = self.services.dispatch.worker_delay();

        let campaign = self.services.store.load(&id).await?;
        if let Some(token) = &request.resume_token {
            debug!(
                "Hop {} for campaign {} issued at cursor {}, stored cursor is {}",
                hop, id, token.cursor, campaign.current_index
            );
        }
        info!("Worker hop {} starting for campaign {} ({})", hop, id, campaign.status);
        let start_cursor = campaign.current_index;

        let mut processed = 0;
        while started.elapsed() < budget {
            let step = self.processor.process(&id, campaign.turbo_mode).await?;
            if !step.status.advanced() {
                break;
            }
            processed += 1;

            let remaining = budget.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(delay.min(remaining)).await;
        }

        let campaign = self.services.store.load(&id).await?;
        let continuation = if campaign.status == CampaignStatus::Processing {
            let idle_hops = if campaign.current_index > start_cursor {
                0
            } else {
                idle_hops.saturating_add(1)
            };
            self.schedule_next(&campaign, hop, idle_hops).await
        } else {
            ContinuationStatus::NotNeeded
        };

        let runtime = started.elapsed().as_millis() as u64;
        info!(
            "Worker hop {} for campaign {} processed {} recipient(s) in {}ms, status {}",
            hop, id, processed, runtime, campaign.status
        );

        Ok(WorkerSummary {
            processed,
            status: campaign.status,
            runtime,
            continuation,
        })
    }

    async fn schedule_next(&self, campaign: &Campaign, hop: u32, idle_hops: u32) -> ContinuationStatus {
        let max_idle_hops = self.services.dispatch.max_idle_hops;
        if idle_hops >= max_idle_hops {
            error!(
                "Campaign {} made no progress in {} consecutive hops at {}/{}, not scheduling a continuation",
                campaign.id,
                idle_hops,
                campaign.current_index,
                campaign.total()
            );
            return ContinuationStatus::Failed {
                error: format!("no progress in {} consecutive hops", idle_hops),
            };
        }

        let next_hop = hop.saturating_add(1);
        let token = ResumeToken {
            campaign_id: campaign.id.to_string(),
            hop: next_hop,
            cursor: campaign.current_index,
            idle_hops,
            issued_at: Utc::now(),
        };

        let retries = self.services.dispatch.continuation_retries;
        let mut last_error = String::new();
        for attempt in 0..=retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(CONTINUATION_BACKOFF_MS << (attempt - 1).min(6));
                tokio::time::sleep(backoff).await;
            }

            match self.continuation.schedule(&token).await {
                Ok(()) => {
                    info!("Scheduled hop {} for campaign {} at cursor {}", next_hop, campaign.id, token.cursor);
                    return ContinuationStatus::Scheduled { hop: next_hop };
                }
                Err(e) => {
                    warn!(
                        "Continuation attempt {}/{} for campaign {} failed: {}",
                        attempt + 1,
                        retries + 1,
                        campaign.id,
                        e
                    );
                    last_error = e.to_string();
                }
            }
        }

        error!(
            "Campaign {} will stall at {}/{}: continuation could not be scheduled ({})",
            campaign.id,
            campaign.current_index,
            campaign.total(),
            last_error
        );
        ContinuationStatus::Failed { error: last_error }
    }
}
