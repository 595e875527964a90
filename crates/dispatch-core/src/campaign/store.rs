//! Document storage for campaigns, settings and agents
//!
//! Campaign writes are version checked: `save` only succeeds when the
//! stored record still carries the version the caller loaded. A mismatch
//! is reported as `DispatchError::Conflict` so the caller can reload and
//! re-apply its change.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use super::types::{Campaign, CampaignId};
use crate::error::{DispatchError, Result};
use crate::paths;
use crate::types::{Agent, DeliverySettings};

#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Load a campaign; `NotFound` when absent
    async fn load(&self, id: &CampaignId) -> Result<Campaign>;

    /// All campaigns, newest first
    async fn list(&self) -> Result<Vec<Campaign>>;

    /// Store a new campaign; `Conflict` when the id is taken
    async fn insert(&self, campaign: &Campaign) -> Result<Campaign>;

    /// Versioned write. Returns the stored copy with its bumped version.
    async fn save(&self, campaign: &Campaign) -> Result<Campaign>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load_settings(&self) -> Result<Option<DeliverySettings>>;

    async fn save_settings(&self, settings: &DeliverySettings) -> Result<()>;

    async fn load_agent(&self, id: &str) -> Result<Option<Agent>>;
}

/// Load, mutate and save, starting over on version conflicts.
///
/// `mutate` may run several times and must be safe to re-apply to a
/// freshly loaded record. Errors it returns abort without writing.
pub async fn update_with_retry<F>(
    store: &dyn CampaignStore,
    id: &CampaignId,
    attempts: u32,
    mut mutate: F,
) -> Result<Campaign>
where
    F: FnMut(&mut Campaign) -> Result<()> + Send,
{
    let attempts = attempts.max(1);
    let mut last_conflict = String::new();

    for attempt in 1..=attempts {
        let mut campaign = store.load(id).await?;
        mutate(&mut campaign)?;

        match store.save(&campaign).await {
            Ok(saved) => return Ok(saved),
            Err(DispatchError::Conflict(msg)) => {
                debug!("Conflict saving campaign {} (attempt {}/{}): {}", id, attempt, attempts, msg);
                last_conflict = msg;
            }
            Err(e) => return Err(e),
        }
    }

    warn!("Giving up on campaign {} after {} conflicting writes", id, attempts);
    Err(DispatchError::Conflict(last_conflict))
}

/// One JSON document per campaign under `<root>/campaigns`
pub struct FileStore {
    root_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create the store, creating its directory layout
    pub fn new<P: AsRef<Path>>(root_path: P) -> Result<Self> {
        let root_path = root_path.as_ref().to_path_buf();

        for dir in paths::all_store_directories(&root_path) {
            std::fs::create_dir_all(&dir)?;
        }

        Ok(Self {
            root_path,
            write_lock: Mutex::new(()),
        })
    }

    fn campaign_path(&self, id: &CampaignId) -> PathBuf {
        paths::campaigns_dir_in(&self.root_path).join(paths::campaign_file_name(id.as_str()))
    }

    fn agent_path(&self, id: &str) -> PathBuf {
        paths::agents_dir_in(&self.root_path).join(paths::agent_file_name(id))
    }

    async fn read_campaign(&self, path: &Path) -> Result<Campaign> {
        let json = fs::read_to_string(path).await?;

        serde_json::from_str(&json)
            .map_err(|e| DispatchError::Deserialization(format!("Failed to deserialize campaign: {}", e)))
    }

    /// Write through a temp file so readers never see a half-written document
    async fn write_document<T: serde::Serialize + Sync>(&self, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| DispatchError::Serialization(format!("Failed to serialize document: {}", e)))?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, path).await?;

        Ok(())
    }

    async fn read_optional<T: serde::de::DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(json) => serde_json::from_str(&json).map(Some).map_err(|e| {
                DispatchError::Deserialization(format!("Failed to deserialize {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store an agent persona
    pub async fn save_agent(&self, agent: &Agent) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_document(&self.agent_path(&agent.id), agent).await
    }
}

#[async_trait]
impl CampaignStore for FileStore {
    async fn load(&self, id: &CampaignId) -> Result<Campaign> {
        let path = self.campaign_path(id);
        match self.read_optional::<Campaign>(&path).await? {
            Some(campaign) => Ok(campaign),
            None => Err(DispatchError::NotFound(format!("Campaign {} not found", id))),
        }
    }

    async fn list(&self) -> Result<Vec<Campaign>> {
        let mut campaigns = Vec::new();
        let mut entries = fs::read_dir(paths::campaigns_dir_in(&self.root_path)).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_campaign = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("campaign_") && n.ends_with(".json"))
                .unwrap_or(false);
            if !is_campaign {
                continue;
            }

            match self.read_campaign(&path).await {
                Ok(campaign) => campaigns.push(campaign),
                Err(e) => warn!("Skipping unreadable campaign file {:?}: {}", path, e),
            }
        }

        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(campaigns)
    }

    async fn insert(&self, campaign: &Campaign) -> Result<Campaign> {
        let _guard = self.write_lock.lock().await;
        let path = self.campaign_path(&campaign.id);

        if fs::try_exists(&path).await? {
            return Err(DispatchError::Conflict(format!("Campaign {} already exists", campaign.id)));
        }

        let mut stored = campaign.clone();
        stored.version = 1;
        stored.updated_at = Utc::now();
        self.write_document(&path, &stored).await?;

        debug!("Created campaign {} at {:?}", stored.id, path);
        Ok(stored)
    }

    async fn save(&self, campaign: &Campaign) -> Result<Campaign> {
        let _guard = self.write_lock.lock().await;
        let path = self.campaign_path(&campaign.id);

        let current = self
            .read_optional::<Campaign>(&path)
            .await?
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
        self.write_document(&path, &stored).await?;

        Ok(stored)
    }
}

#[async_trait]
impl SettingsStore for FileStore {
    async fn load_settings(&self) -> Result<Option<DeliverySettings>> {
        self.read_optional(&paths::settings_path_in(&self.root_path)).await
    }

    async fn save_settings(&self, settings: &DeliverySettings) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_document(&paths::settings_path_in(&self.root_path), settings).await
    }

    async fn load_agent(&self, id: &str) -> Result<Option<Agent>> {
        self.read_optional(&self.agent_path(id)).await
    }
}
