//! Campaign records, storage and lifecycle control

pub mod control;
pub mod memory;
pub mod store;
pub mod types;

pub use control::CampaignControl;
pub use memory::MemoryStore;
pub use store::{update_with_retry, CampaignStore, FileStore, SettingsStore};
pub use types::{Campaign, CampaignId, CampaignSummary, LogEntry, ProgressDelta};
