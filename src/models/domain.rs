use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of historical gust slots stored per property
pub const GUST_SLOTS: usize = 5;

/// Scored property as stored in the `properties` table
///
/// Field order matters: CSV export uses declaration order for its header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub property_id: String,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub zip: Option<i64>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub estimated_value: Option<f64>,
    #[serde(default)]
    pub combined_score: Option<i64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub year_built: Option<i32>,
    #[serde(default)]
    pub roof_type: Option<String>,
    #[serde(default)]
    pub building_type: Option<String>,
    #[serde(default)]
    pub living_area_sqft: Option<f64>,
    #[serde(default)]
    pub count_gusts: Option<i64>,
    #[serde(default)]
    pub gust_1: Option<f64>,
    #[serde(default)]
    pub gust_1_date: Option<String>,
    #[serde(default)]
    pub gust_2: Option<f64>,
    #[serde(default)]
    pub gust_2_date: Option<String>,
    #[serde(default)]
    pub gust_3: Option<f64>,
    #[serde(default)]
    pub gust_3_date: Option<String>,
    #[serde(default)]
    pub gust_4: Option<f64>,
    #[serde(default)]
    pub gust_4_date: Option<String>,
    #[serde(default)]
    pub gust_5: Option<f64>,
    #[serde(default)]
    pub gust_5_date: Option<String>,
}

impl Property {
    /// Gust slots 1..=5 in order, each possibly empty
    pub fn gust_slots(&self) -> [(Option<f64>, Option<&str>); GUST_SLOTS] {
        [
            (self.gust_1, self.gust_1_date.as_deref()),
            (self.gust_2, self.gust_2_date.as_deref()),
            (self.gust_3, self.gust_3_date.as_deref()),
            (self.gust_4, self.gust_4_date.as_deref()),
            (self.gust_5, self.gust_5_date.as_deref()),
        ]
    }

    /// Complete gust observations (both magnitude and date present), slot order preserved
    pub fn gusts(&self) -> Vec<GustObservation> {
        self.gust_slots()
            .iter()
            .enumerate()
            .filter_map(|(idx, (gust, date))| match (gust, date) {
                (Some(gust_mph), Some(date)) if !date.trim().is_empty() => Some(GustObservation {
                    slot: idx as u8 + 1,
                    gust_mph: *gust_mph,
                    date: date.to_string(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Coordinates when both are present
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// One historical high-wind observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GustObservation {
    /// Original slot index (1..=5)
    pub slot: u8,
    pub gust_mph: f64,
    pub date: String,
}

/// Address fields embedded when reading interactions joined to their property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySummary {
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub zip: Option<i64>,
    #[serde(default)]
    pub owner_name: Option<String>,
}

/// CRM pipeline status
///
/// Values read back from the store that fall outside the fixed set are kept
/// verbatim in `Unknown` so a bad row never breaks a listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CrmStatus {
    Contacted,
    Interested,
    NotInterested,
    ScheduledCall,
    PendingFollowup,
    ClosedWon,
    ClosedLost,
    Unknown(String),
}

impl CrmStatus {
    pub const ALL: [CrmStatus; 7] = [
        CrmStatus::Contacted,
        CrmStatus::Interested,
        CrmStatus::NotInterested,
        CrmStatus::ScheduledCall,
        CrmStatus::PendingFollowup,
        CrmStatus::ClosedWon,
        CrmStatus::ClosedLost,
    ];

    /// Parse a known status; `None` for anything outside the enumeration
    pub fn parse_known(value: &str) -> Option<Self> {
        match CrmStatus::from(value.to_string()) {
            CrmStatus::Unknown(_) => None,
            status => Some(status),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CrmStatus::Contacted => "contacted",
            CrmStatus::Interested => "interested",
            CrmStatus::NotInterested => "not_interested",
            CrmStatus::ScheduledCall => "scheduled_call",
            CrmStatus::PendingFollowup => "pending_followup",
            CrmStatus::ClosedWon => "closed_won",
            CrmStatus::ClosedLost => "closed_lost",
            CrmStatus::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, CrmStatus::Unknown(_))
    }
}

impl Default for CrmStatus {
    fn default() -> Self {
        CrmStatus::Contacted
    }
}

impl From<String> for CrmStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "contacted" => CrmStatus::Contacted,
            "interested" => CrmStatus::Interested,
            "not_interested" => CrmStatus::NotInterested,
            "scheduled_call" => CrmStatus::ScheduledCall,
            "pending_followup" => CrmStatus::PendingFollowup,
            "closed_won" => CrmStatus::ClosedWon,
            "closed_lost" => CrmStatus::ClosedLost,
            _ => CrmStatus::Unknown(value),
        }
    }
}

impl From<CrmStatus> for String {
    fn from(value: CrmStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for CrmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CRM interaction row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrmInteraction {
    pub id: String,
    #[serde(default)]
    pub property_id: Option<String>,
    pub status: CrmStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub scheduled_call_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present only on joined reads
    #[serde(rename = "properties", default, skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertySummary>,
}

/// Insert payload for a new interaction
#[derive(Debug, Clone, Serialize)]
pub struct NewCrmInteraction {
    pub id: String,
    pub property_id: Option<String>,
    pub status: CrmStatus,
    pub notes: Option<String>,
    pub scheduled_call_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public access request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Map viewport derived from a property set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gusts_skip_incomplete_pairs() {
        let property = Property {
            property_id: "p1".to_string(),
            gust_1: Some(61.2),
            gust_1_date: Some("2023-06-14".to_string()),
            gust_2: Some(58.0),
            gust_3: Some(70.4),
            gust_3_date: Some("2021-04-02".to_string()),
            gust_4_date: Some("2020-01-01".to_string()),
            ..Default::default()
        };

        let gusts = property.gusts();
        assert_eq!(gusts.len(), 2);
        assert_eq!(gusts[0].slot, 1);
        assert_eq!(gusts[1].slot, 3);
    }

    #[test]
    fn test_status_round_trip_through_string() {
        for status in CrmStatus::ALL {
            let raw: String = status.clone().into();
            assert_eq!(CrmStatus::from(raw), status);
        }
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let status: CrmStatus = serde_json::from_str("\"ghosted\"").unwrap();
        assert_eq!(status, CrmStatus::Unknown("ghosted".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"ghosted\"");
        assert!(CrmStatus::parse_known("ghosted").is_none());
    }

    #[test]
    fn test_interaction_deserializes_join() {
        let json = r#"{
            "id": "i1",
            "property_id": "p1",
            "status": "scheduled_call",
            "notes": null,
            "scheduled_call_date": "2026-11-01T15:00:00Z",
            "created_at": "2026-10-01T10:00:00Z",
            "updated_at": "2026-10-02T10:00:00Z",
            "properties": {"formatted_address": "1 Main St", "city": "Plano", "zip": 75024}
        }"#;

        let interaction: CrmInteraction = serde_json::from_str(json).unwrap();
        assert_eq!(interaction.status, CrmStatus::ScheduledCall);
        assert_eq!(
            interaction.property.unwrap().city.as_deref(),
            Some("Plano")
        );
    }
}
