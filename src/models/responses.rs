use crate::core::aggregation::PropertyStats;
use crate::core::crm::{CrmStats, StatusTag};
use crate::core::filters::FilterSelection;
use crate::models::domain::{CrmInteraction, MapView, Property};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// User-facing message the client shows as a toast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Filter options, rows and aggregates for one selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub selection: FilterSelection,
    pub cities: Vec<String>,
    pub zip_codes: Vec<i64>,
    pub scores: Vec<i64>,
    /// Absent when the count query failed
    pub total_count: Option<u64>,
    pub properties: Vec<Property>,
    pub map: MapView,
    pub stats: PropertyStats,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOptionsResponse {
    pub cities: Vec<String>,
    pub zip_codes: Vec<i64>,
    pub scores: Vec<i64>,
    #[serde(default)]
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub total_count: u64,
}

/// An interaction with its display tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionView {
    #[serde(flatten)]
    pub interaction: CrmInteraction,
    pub status_tag: StatusTag,
}

impl From<CrmInteraction> for InteractionView {
    fn from(interaction: CrmInteraction) -> Self {
        let status_tag = crate::core::crm::status_tag(&interaction.status);
        Self {
            interaction,
            status_tag,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionListResponse {
    pub interactions: Vec<InteractionView>,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

impl InteractionListResponse {
    pub fn new(interactions: Vec<CrmInteraction>) -> Self {
        let interactions: Vec<InteractionView> = interactions.into_iter().map(Into::into).collect();
        Self {
            total: interactions.len(),
            interactions,
            notices: Vec::new(),
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmStatsResponse {
    #[serde(flatten)]
    pub stats: CrmStats,
    pub statuses: Vec<StatusTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRequestResponse {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUploadResponse {
    pub property_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarUploadResponse {
    pub user_id: String,
    pub url: String,
}
