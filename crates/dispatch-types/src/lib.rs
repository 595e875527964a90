//! Shared types for the campaign dispatch engine
//!
//! Everything in here crosses the HTTP boundary, so all structs serialize
//! with camelCase field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Processing,
    Paused,
    Completed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Processing => "processing",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unknown campaign status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for CampaignStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "processing" => Ok(Self::Processing),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Outcome reported by a single processing call.
///
/// The first three describe what happened to the recipient under the cursor;
/// the rest echo the campaign state when no recipient was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Sent,
    Skipped,
    Failed,
    Completed,
    Draft,
    Paused,
    Processing,
}

impl StepStatus {
    /// Whether the call consumed a recipient
    pub fn advanced(&self) -> bool {
        matches!(self, Self::Sent | Self::Skipped | Self::Failed)
    }
}

impl From<CampaignStatus> for StepStatus {
    fn from(status: CampaignStatus) -> Self {
        match status {
            CampaignStatus::Draft => Self::Draft,
            CampaignStatus::Processing => Self::Processing,
            CampaignStatus::Paused => Self::Paused,
            CampaignStatus::Completed => Self::Completed,
        }
    }
}

/// One entry of an imported recipient list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Recipient {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            company: None,
            title: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Subject and body as authored, still containing macros and tags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub subject: String,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Campaign control requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    pub name: String,
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub template: Template,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub domains: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub template: Template,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub rotate_domains: Option<bool>,
    #[serde(default)]
    pub rotate_sender_name: Option<bool>,
    #[serde(default)]
    pub domains: Option<Vec<String>>,
    #[serde(default)]
    pub vary_subject: Option<bool>,
    #[serde(default)]
    pub use_html: Option<bool>,
    #[serde(default)]
    pub turbo_mode: Option<bool>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRequest {
    #[serde(default)]
    pub template: Option<Template>,
}

// ---------------------------------------------------------------------------
// Processing requests and responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub campaign_id: String,
    #[serde(default)]
    pub turbo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurboRequest {
    pub campaign_id: String,
}

/// Handed from one worker hop to the next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeToken {
    pub campaign_id: String,
    pub hop: u32,
    pub cursor: usize,
    /// Consecutive hops that ended without moving the cursor
    #[serde(default)]
    pub idle_hops: u32,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    pub campaign_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_token: Option<ResumeToken>,
    /// Acknowledge immediately and run in the background
    #[serde(default)]
    pub detached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    pub current_index: usize,
    pub sent_count: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub status: CampaignStatus,
    pub batch: usize,
    pub sent: usize,
    pub failed: usize,
    pub current_index: usize,
    pub sent_count: usize,
    pub total: usize,
    /// Milliseconds spent on the batch
    pub elapsed: u64,
    /// Messages per second over the batch
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ContinuationStatus {
    NotNeeded,
    Scheduled { hop: u32 },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSummary {
    pub processed: usize,
    pub status: CampaignStatus,
    /// Milliseconds spent inside this hop
    pub runtime: u64,
    pub continuation: ContinuationStatus,
}

// ---------------------------------------------------------------------------
// Variation preview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeVariationsRequest {
    pub text: String,
}

/// A single `{%a|b|c%}` macro found in template text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationSlot {
    pub raw: String,
    pub options: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationAnalysis {
    pub count: u64,
    pub slots: Vec<VariationSlot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_status_round_trips_lowercase() {
        let json = serde_json::to_string(&CampaignStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        assert_eq!("Paused".parse::<CampaignStatus>().unwrap(), CampaignStatus::Paused);
        assert!("archived".parse::<CampaignStatus>().is_err());
    }

    #[test]
    fn test_step_status_advanced() {
        assert!(StepStatus::Sent.advanced());
        assert!(StepStatus::Skipped.advanced());
        assert!(StepStatus::Failed.advanced());
        assert!(!StepStatus::Completed.advanced());
        assert!(!StepStatus::from(CampaignStatus::Paused).advanced());
    }

    #[test]
    fn test_process_request_defaults_turbo_to_false() {
        let req: ProcessRequest = serde_json::from_str(r#"{"campaignId": "abc"}"#).unwrap();
        assert_eq!(req.campaign_id, "abc");
        assert!(!req.turbo);
    }

    #[test]
    fn test_continuation_status_is_tagged() {
        let json = serde_json::to_value(ContinuationStatus::Scheduled { hop: 3 }).unwrap();
        assert_eq!(json["state"], "scheduled");
        assert_eq!(json["hop"], 3);
    }

    #[test]
    fn test_resume_token_without_idle_hops_parses() {
        let json = r#"{"campaignId":"c1","hop":7,"cursor":12,"issuedAt":"2026-01-01T00:00:00Z"}"#;
        let token: ResumeToken = serde_json::from_str(json).unwrap();
        assert_eq!((token.hop, token.cursor, token.idle_hops), (7, 12, 0));
    }

    #[test]
    fn test_recipient_omits_missing_fields() {
        let json = serde_json::to_string(&Recipient::new("a@b.io")).unwrap();
        assert_eq!(json, r#"{"email":"a@b.io"}"#);
    }
}
