//! Shared application state handed to every handler

use dispatch_core::{
    CampaignControl, ContinuationScheduler, ContinuousWorker, DispatchServices, SingleStepProcessor, TurboDispatcher,
};
use std::sync::Arc;

pub struct AppState {
    pub control: CampaignControl,
    pub processor: SingleStepProcessor,
    pub turbo: TurboDispatcher,
    pub worker: ContinuousWorker,
}

impl AppState {
    pub fn new(
        services: Arc<DispatchServices>,
        control: CampaignControl,
        continuation: Arc<dyn ContinuationScheduler>,
    ) -> Self {
        Self {
            control,
            processor: SingleStepProcessor::new(services.clone()),
            turbo: TurboDispatcher::new(services.clone()),
            worker: ContinuousWorker::new(services, continuation),
        }
    }
}
