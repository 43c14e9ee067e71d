//! Lead records captured from the `collect_contact_info` tool

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Contact details volunteered by a visitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Sales pipeline status of a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadRecordStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl LeadRecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Converted => "converted",
            Self::Lost => "lost",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "contacted" => Self::Contacted,
            "qualified" => Self::Qualified,
            "converted" => Self::Converted,
            "lost" => Self::Lost,
            _ => Self::New,
        }
    }
}

/// A captured sales lead
///
/// `conversation_id` is a weak reference; the conversation may not exist yet
/// when the lead is inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub conversation_id: String,
    pub contact_info: ContactInfo,
    #[serde(default)]
    pub project_details: serde_json::Value,
    #[serde(default)]
    pub status: LeadRecordStatus,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// New lead with status `new`
    pub fn new(conversation_id: impl Into<String>, contact_info: ContactInfo) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            contact_info,
            project_details: serde_json::Value::Object(Default::default()),
            status: LeadRecordStatus::New,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lead_defaults() {
        let lead = Lead::new(
            "conv-9",
            ContactInfo {
                name: "Ada".to_string(),
                email: "a@b.com".to_string(),
                phone: None,
                company: Some("Analytical Engines".to_string()),
                message: None,
            },
        );
        assert_eq!(lead.status, LeadRecordStatus::New);
        assert_eq!(lead.conversation_id, "conv-9");
        assert!(lead.project_details.is_object());

        let json = serde_json::to_value(&lead).unwrap();
        assert_eq!(json["status"], "new");
        assert_eq!(json["contactInfo"]["company"], "Analytical Engines");
        assert!(json["contactInfo"].get("phone").is_none());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            LeadRecordStatus::New,
            LeadRecordStatus::Contacted,
            LeadRecordStatus::Qualified,
            LeadRecordStatus::Converted,
            LeadRecordStatus::Lost,
        ] {
            assert_eq!(LeadRecordStatus::parse(status.as_str()), status);
        }
    }
}
