//! Campaign record and its bookkeeping helpers

use chrono::{DateTime, Utc};
use dispatch_types::{CampaignStatus, Recipient, StepStatus, Template};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::RunConfig;

/// Strongly typed CampaignId
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignId(String);

impl CampaignId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s.trim())
            .map(|_| Self(s.trim().to_string()))
            .map_err(|e| format!("Invalid CampaignId format: {}", e))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CampaignId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One processed recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub recipient: String,
    /// 1-based position of the recipient in the list
    pub step: usize,
    pub status: StepStatus,
    pub message: String,
}

impl LogEntry {
    pub fn new(index: usize, recipient: &str, status: StepStatus, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            recipient: recipient.to_string(),
            step: index + 1,
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub status: CampaignStatus,
    pub recipients: Vec<Recipient>,

    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub sent_count: usize,
    #[serde(default)]
    pub skipped_count: usize,
    #[serde(default)]
    pub failed_count: usize,

    /// Most recent first
    #[serde(default)]
    pub logs: Vec<LogEntry>,

    #[serde(default)]
    pub template: Template,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub rotate_domains: bool,
    #[serde(default)]
    pub rotate_sender_name: bool,
    #[serde(default)]
    pub vary_subject: bool,
    #[serde(default)]
    pub use_html: bool,
    #[serde(default)]
    pub turbo_mode: bool,
    #[serde(default)]
    pub agent_id: Option<String>,

    #[serde(default)]
    pub cached_settings: Option<RunConfig>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Bumped by the store on every successful save
    #[serde(default)]
    pub version: u64,

    /// Incremented whenever progress is reset; progress recorded against
    /// an earlier run is discarded
    #[serde(default)]
    pub run: u64,
}

impl Campaign {
    pub fn new(name: impl Into<String>, recipients: Vec<Recipient>, template: Template) -> Self {
        let now = Utc::now();
        Self {
            id: CampaignId::new(),
            name: name.into(),
            status: CampaignStatus::Draft,
            recipients,
            current_index: 0,
            sent_count: 0,
            skipped_count: 0,
            failed_count: 0,
            logs: Vec::new(),
            template,
            sender_name: String::new(),
            domains: Vec::new(),
            rotate_domains: false,
            rotate_sender_name: false,
            vary_subject: false,
            use_html: false,
            turbo_mode: false,
            agent_id: None,
            cached_settings: None,
            created_at: now,
            updated_at: now,
            version: 0,
            run: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.recipients.len()
    }

    pub fn remaining(&self) -> usize {
        self.total().saturating_sub(self.current_index)
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.total()
    }

    /// Prepend to the ring buffer, dropping the oldest entries past `cap`
    pub fn push_log(&mut self, entry: LogEntry, cap: usize) {
        self.logs.insert(0, entry);
        self.logs.truncate(cap);
    }

    /// Zero cursor, counters and logs and open a new run
    pub fn reset_progress(&mut self) {
        self.run += 1;
        self.current_index = 0;
        self.sent_count = 0;
        self.skipped_count = 0;
        self.failed_count = 0;
        self.logs.clear();
    }

    /// Fold the result of processing one or more recipients into this record.
    ///
    /// The cursor never moves backwards, so applying a delta to a record
    /// another writer already advanced keeps the larger value. A delta from
    /// an earlier run leaves the record untouched and returns `false`.
    pub fn apply_delta(&mut self, delta: &ProgressDelta, log_cap: usize) -> bool {
        if delta.run != self.run {
            return false;
        }
        self.current_index = self.current_index.max(delta.cursor).min(self.total());
        self.sent_count += delta.sent;
        self.skipped_count += delta.skipped;
        self.failed_count += delta.failed;
        for entry in delta.logs.iter().rev() {
            self.push_log(entry.clone(), log_cap);
        }
        if self.cached_settings.is_none() {
            self.cached_settings = delta.run_config.clone();
        }
        true
    }

    /// Flip to completed once the cursor has reached the end
    pub fn complete_if_exhausted(&mut self) -> bool {
        if self.status == CampaignStatus::Processing && self.is_exhausted() {
            self.status = CampaignStatus::Completed;
            return true;
        }
        false
    }

    pub fn summary(&self) -> CampaignSummary {
        CampaignSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status,
            current_index: self.current_index,
            total: self.total(),
            sent_count: self.sent_count,
            skipped_count: self.skipped_count,
            failed_count: self.failed_count,
            updated_at: self.updated_at,
        }
    }
}

/// Outcome of a processing call, ready to be merged into a stored record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressDelta {
    /// Run the recipients were taken from
    pub run: u64,
    /// Cursor value after the processed recipients
    pub cursor: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Most recent first
    pub logs: Vec<LogEntry>,
    /// Settings resolved during the call for a record that had none
    pub run_config: Option<RunConfig>,
}

impl ProgressDelta {
    pub fn at(run: u64, cursor: usize) -> Self {
        Self {
            run,
            cursor,
            ..Self::default()
        }
    }

    /// Count one outcome and record its log entry
    pub fn record(&mut self, entry: LogEntry) {
        match entry.status {
            StepStatus::Sent => self.sent += 1,
            StepStatus::Skipped => self.skipped += 1,
            StepStatus::Failed => self.failed += 1,
            _ => {}
        }
        self.logs.insert(0, entry);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSummary {
    pub id: CampaignId,
    pub name: String,
    pub status: CampaignStatus,
    pub current_index: usize,
    pub total: usize,
    pub sent_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign(n: usize) -> Campaign {
        let recipients = (0..n).map(|i| Recipient::new(format!("user{}@acme.io", i))).collect();
        Campaign::new("Launch", recipients, Template::default())
    }

    #[test]
    fn test_campaign_id_validation() {
        let id = CampaignId::new();
        assert_eq!(CampaignId::from_string(id.as_str()).unwrap(), id);
        assert!(CampaignId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_log_ring_buffer_is_capped_newest_first() {
        let mut c = campaign(10);
        for i in 0..7 {
            c.push_log(LogEntry::new(i, "x@acme.io", StepStatus::Sent, format!("#{}", i)), 5);
        }
        assert_eq!(c.logs.len(), 5);
        assert_eq!(c.logs[0].message, "#6");
        assert_eq!(c.logs[4].message, "#2");
    }

    #[test]
    fn test_delta_never_moves_cursor_backwards() {
        let mut c = campaign(10);
        c.current_index = 6;
        let mut delta = ProgressDelta::at(c.run, 4);
        delta.record(LogEntry::new(3, "user3@acme.io", StepStatus::Sent, "ok"));
        c.apply_delta(&delta, 50);
        assert_eq!(c.current_index, 6);
        assert_eq!(c.sent_count, 1);
    }

    #[test]
    fn test_delta_cursor_is_clamped_to_total() {
        let mut c = campaign(2);
        c.apply_delta(&ProgressDelta::at(c.run, 9), 50);
        assert_eq!(c.current_index, 2);
    }

    #[test]
    fn test_delta_logs_keep_order() {
        let mut c = campaign(3);
        let mut delta = ProgressDelta::at(c.run, 3);
        for i in 0..3 {
            delta.record(LogEntry::new(i, "u@acme.io", StepStatus::Failed, format!("#{}", i)));
        }
        c.apply_delta(&delta, 50);
        let order: Vec<&str> = c.logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(order, vec!["#2", "#1", "#0"]);
        assert_eq!(c.failed_count, 3);
    }

    #[test]
    fn test_reset_progress() {
        let mut c = campaign(3);
        c.current_index = 2;
        c.sent_count = 1;
        c.skipped_count = 1;
        c.push_log(LogEntry::new(0, "a@acme.io", StepStatus::Sent, "ok"), 50);
        c.reset_progress();
        assert_eq!((c.current_index, c.sent_count, c.skipped_count, c.failed_count), (0, 0, 0, 0));
        assert!(c.logs.is_empty());
        assert_eq!(c.run, 1);
    }

    #[test]
    fn test_delta_from_earlier_run_is_discarded() {
        let mut c = campaign(4);
        let mut stale = ProgressDelta::at(c.run, 2);
        stale.record(LogEntry::new(0, "a@acme.io", StepStatus::Sent, "ok"));
        stale.record(LogEntry::new(1, "b@acme.io", StepStatus::Sent, "ok"));
        c.reset_progress();

        assert!(!c.apply_delta(&stale, 50));
        assert_eq!((c.current_index, c.sent_count), (0, 0));
        assert!(c.logs.is_empty());
    }

    #[test]
    fn test_complete_if_exhausted_only_from_processing() {
        let mut c = campaign(1);
        c.current_index = 1;
        assert!(!c.complete_if_exhausted());
        c.status = CampaignStatus::Processing;
        assert!(c.complete_if_exhausted());
        assert_eq!(c.status, CampaignStatus::Completed);
    }

    #[test]
    fn test_campaign_serializes_camel_case() {
        let json = serde_json::to_value(campaign(1)).unwrap();
        assert!(json.get("currentIndex").is_some());
        assert!(json.get("cachedSettings").is_some());
        assert_eq!(json["status"], "draft");
    }
}
