use crate::models::{CrmInteraction, CrmStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Display label and color tag for a status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTag {
    pub value: String,
    pub label: String,
    pub color: String,
}

pub fn status_tag(status: &CrmStatus) -> StatusTag {
    let (label, color) = match status {
        CrmStatus::Contacted => ("Contacted".to_string(), "blue"),
        CrmStatus::Interested => ("Interested".to_string(), "green"),
        CrmStatus::NotInterested => ("Not Interested".to_string(), "red"),
        CrmStatus::ScheduledCall => ("Scheduled Call".to_string(), "purple"),
        CrmStatus::PendingFollowup => ("Pending Follow-up".to_string(), "yellow"),
        CrmStatus::ClosedWon => ("Closed Won".to_string(), "emerald"),
        CrmStatus::ClosedLost => ("Closed Lost".to_string(), "slate"),
        CrmStatus::Unknown(raw) => (format!("Unknown ({})", raw), "gray"),
    };

    StatusTag {
        value: status.as_str().to_string(),
        label,
        color: color.to_string(),
    }
}

/// Summary over a set of interactions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmStats {
    pub total: usize,
    /// Every known status is present, zero-filled
    pub by_status: BTreeMap<String, usize>,
    pub unknown_status: usize,
    pub upcoming_calls: usize,
    pub properties_touched: usize,
    /// closed_won / (closed_won + closed_lost), absent until something closes
    pub win_rate: Option<f64>,
}

pub fn summarize(interactions: &[CrmInteraction], now: DateTime<Utc>) -> CrmStats {
    let mut by_status: BTreeMap<String, usize> = CrmStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    let mut unknown_status = 0;

    for interaction in interactions {
        if interaction.status.is_known() {
            *by_status
                .entry(interaction.status.as_str().to_string())
                .or_insert(0) += 1;
        } else {
            unknown_status += 1;
        }
    }

    let upcoming_calls = interactions
        .iter()
        .filter(|i| i.scheduled_call_date.map_or(false, |d| d > now))
        .count();

    let properties_touched = interactions
        .iter()
        .filter_map(|i| i.property_id.as_deref())
        .collect::<HashSet<_>>()
        .len();

    let won = by_status[CrmStatus::ClosedWon.as_str()];
    let lost = by_status[CrmStatus::ClosedLost.as_str()];
    let win_rate = if won + lost > 0 {
        Some(won as f64 / (won + lost) as f64)
    } else {
        None
    };

    CrmStats {
        total: interactions.len(),
        by_status,
        unknown_status,
        upcoming_calls,
        properties_touched,
        win_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn interaction(id: &str, property: Option<&str>, status: CrmStatus) -> CrmInteraction {
        let now = Utc::now();
        CrmInteraction {
            id: id.to_string(),
            property_id: property.map(str::to_string),
            status,
            notes: None,
            scheduled_call_date: None,
            created_at: now,
            updated_at: now,
            property: None,
        }
    }

    #[test]
    fn test_every_known_status_has_a_tag() {
        let labels: HashSet<String> = CrmStatus::ALL.iter().map(|s| status_tag(s).label).collect();
        assert_eq!(labels.len(), 7);
        assert!(CrmStatus::ALL.iter().all(|s| status_tag(s).color != "gray"));
    }

    #[test]
    fn test_unknown_status_tag() {
        let tag = status_tag(&CrmStatus::Unknown("ghosted".to_string()));
        assert_eq!(tag.label, "Unknown (ghosted)");
        assert_eq!(tag.color, "gray");
        assert_eq!(tag.value, "ghosted");
    }

    #[test]
    fn test_summarize() {
        let now = Utc::now();
        let mut call = interaction("3", Some("p2"), CrmStatus::ScheduledCall);
        call.scheduled_call_date = Some(now + Duration::days(2));
        let mut past_call = interaction("4", Some("p2"), CrmStatus::ScheduledCall);
        past_call.scheduled_call_date = Some(now - Duration::days(2));

        let interactions = vec![
            interaction("1", Some("p1"), CrmStatus::ClosedWon),
            interaction("2", Some("p1"), CrmStatus::ClosedLost),
            call,
            past_call,
            interaction("5", None, CrmStatus::Unknown("legacy".to_string())),
            interaction("6", Some("p3"), CrmStatus::ClosedWon),
        ];

        let stats = summarize(&interactions, now);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.by_status["scheduled_call"], 2);
        assert_eq!(stats.by_status["contacted"], 0);
        assert_eq!(stats.unknown_status, 1);
        assert_eq!(stats.upcoming_calls, 1);
        assert_eq!(stats.properties_touched, 3);
        let rate = stats.win_rate.unwrap();
        assert!((rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_win_rate_without_closed() {
        let stats = summarize(&[interaction("1", None, CrmStatus::Contacted)], Utc::now());
        assert!(stats.win_rate.is_none());
    }
}
