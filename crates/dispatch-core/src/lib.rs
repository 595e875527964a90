//! Campaign Dispatch Core Library
//!
//! Business logic for bulk email campaigns: configuration, external
//! service clients, message preparation, campaign storage and the
//! dispatch strategies that walk a campaign's recipient list.

pub mod campaign;
pub mod clients;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod paths;
pub mod services;
pub mod types;

// Re-export main types for easy access
pub use config::DispatchSettings;
pub use error::{DispatchError, Result};

// Re-export all client types
pub use clients::{
    ApiDeliveryClient,
    DeliveryProvider,
    HickoryMxResolver,
    MxResolver,
    OpenAiClient,
    SmtpDeliveryClient,
    TextCompleter,
};

// Re-export service types
pub use services::{
    CredentialPool,
    Personalizer,
    RecipientValidator,
};

// Re-export campaign types
pub use campaign::{
    Campaign,
    CampaignControl,
    CampaignId,
    CampaignStore,
    CampaignSummary,
    FileStore,
    MemoryStore,
    SettingsStore,
};

// Re-export dispatch strategies
pub use dispatch::{
    ContinuationScheduler,
    ContinuousWorker,
    DispatchServices,
    HttpContinuation,
    SingleStepProcessor,
    TurboDispatcher,
};
