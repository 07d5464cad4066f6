use crate::core::filters::{FilterAction, FilterSelection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Public access request form
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AccessRequestForm {
    #[validate(length(min = 1, max = 100, message = "first name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "last name is required"))]
    pub last_name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(max = 40))]
    #[serde(default)]
    pub phone: Option<String>,
}

impl AccessRequestForm {
    /// Surrounding whitespace never counts as content
    pub fn trimmed(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        }
    }
}

/// Apply one edit to a client-held selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterApplyRequest {
    #[serde(default)]
    pub selection: FilterSelection,
    pub action: FilterAction,
}

/// Selection-scoped reads (dashboard, options, CSV)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub selection: FilterSelection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvExportRequest {
    #[serde(default)]
    pub selection: FilterSelection,
    /// Keep every column, including the excluded ones
    #[serde(default)]
    pub include_all_columns: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExportPdfRequest {
    #[validate(length(min = 1, max = 500, message = "between 1 and 500 properties"))]
    pub property_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInteractionRequest {
    pub property_id: Option<String>,
    /// Defaults to `contacted`
    pub status: Option<String>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
    pub scheduled_call_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateDetailsRequest {
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
    pub scheduled_call_date: Option<DateTime<Utc>>,
}

/// Query string for interaction listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionListQuery {
    pub property_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_form_validation() {
        let valid = AccessRequestForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
        };
        assert!(valid.validate().is_ok());

        let invalid = AccessRequestForm {
            first_name: "  ".to_string(),
            email: "not-an-email".to_string(),
            ..valid
        }
        .trimmed();
        let errors = invalid.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("last_name"));
    }

    #[test]
    fn test_trimmed_drops_blank_phone() {
        let form = AccessRequestForm {
            first_name: " Ada ".to_string(),
            last_name: "Lovelace".to_string(),
            email: " ada@example.com ".to_string(),
            phone: Some("   ".to_string()),
        }
        .trimmed();
        assert_eq!(form.first_name, "Ada");
        assert_eq!(form.email, "ada@example.com");
        assert!(form.phone.is_none());
    }

    #[test]
    fn test_filter_apply_request_parses_action() {
        let req: FilterApplyRequest = serde_json::from_value(serde_json::json!({
            "action": { "type": "toggle", "dimension": "city", "value": "all" }
        }))
        .unwrap();
        assert!(req.selection.cities.is_empty());
        assert!(matches!(req.action, FilterAction::Toggle { .. }));
    }

    #[test]
    fn test_export_request_bounds() {
        let empty = ExportPdfRequest { property_ids: vec![] };
        assert!(empty.validate().is_err());
        let one = ExportPdfRequest {
            property_ids: vec!["TX-1".to_string()],
        };
        assert!(one.validate().is_ok());
    }
}
