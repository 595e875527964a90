/// Path constants and utilities for the dispatch store
use std::path::{Path, PathBuf};
use once_cell::sync::OnceCell;

// Static storage for configurable data root
static DATA_ROOT: OnceCell<String> = OnceCell::new();

pub const DEFAULT_DATA_ROOT: &str = "/data/campaigns";

/// Initialize the data root directory. Can only be called once.
/// If not called, the default `/data/campaigns` will be used.
pub fn init_data_root(path: String) -> Result<(), String> {
    DATA_ROOT.set(path).map_err(|_| "Data root already initialized".to_string())
}

/// Get the configured data root or the default
fn get_data_root() -> &'static str {
    DATA_ROOT.get().map(|s| s.as_str()).unwrap_or(DEFAULT_DATA_ROOT)
}

// Directory names (relative to root)
pub const CAMPAIGNS_DIR_NAME: &str = "campaigns";
pub const AGENTS_DIR_NAME: &str = "agents";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

pub fn data_root() -> PathBuf {
    PathBuf::from(get_data_root())
}

pub fn campaigns_dir_in(root: &Path) -> PathBuf {
    root.join(CAMPAIGNS_DIR_NAME)
}

pub fn agents_dir_in(root: &Path) -> PathBuf {
    root.join(AGENTS_DIR_NAME)
}

pub fn settings_path_in(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE_NAME)
}

pub fn campaign_file_name(id: &str) -> String {
    format!("campaign_{}.json", id)
}

pub fn agent_file_name(id: &str) -> String {
    format!("agent_{}.json", id)
}

pub fn settings_path() -> PathBuf {
    settings_path_in(&data_root())
}

/// Directories the store expects to exist under `root`
pub fn all_store_directories(root: &Path) -> Vec<PathBuf> {
    vec![root.to_path_buf(), campaigns_dir_in(root), agents_dir_in(root)]
}
