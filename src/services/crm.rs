use crate::core::query::TableQuery;
use crate::models::{CrmInteraction, CrmStatus, InteractionListResponse, NewCrmInteraction, Notice};
use crate::services::gateway::{GatewayClient, GatewayError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

/// Interaction columns plus the joined property's address fields
pub const INTERACTION_SELECT: &str = "*,properties(formatted_address,city,zip,owner_name)";

pub const REFRESH_FAILED_NOTICE: &str = "Interaction saved, but the list could not be refreshed";

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("unknown status: {0}")]
    InvalidStatus(String),

    #[error("interaction {0} is already being updated")]
    Busy(String),

    #[error("interaction not found: {0}")]
    NotFound(String),

    #[error("nothing to update")]
    EmptyUpdate,
}

/// Ids of rows with an update in flight
#[derive(Debug, Default)]
pub struct EditLocks {
    held: Mutex<HashSet<String>>,
}

impl EditLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a row; `None` while another update holds it
    pub fn try_lock(&self, id: &str) -> Option<EditGuard<'_>> {
        let mut held = match self.held.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !held.insert(id.to_string()) {
            return None;
        }
        Some(EditGuard {
            locks: self,
            id: id.to_string(),
        })
    }
}

/// Releases the row when dropped
pub struct EditGuard<'a> {
    locks: &'a EditLocks,
    id: String,
}

impl Drop for EditGuard<'_> {
    fn drop(&mut self) {
        let mut held = match self.locks.held.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        held.remove(&self.id);
    }
}

/// Fields accepted when creating an interaction
#[derive(Debug, Clone, Default)]
pub struct InteractionDraft {
    pub property_id: Option<String>,
    pub status: Option<CrmStatus>,
    pub notes: Option<String>,
    pub scheduled_call_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct StatusPatch<'a> {
    status: &'a CrmStatus,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct DetailsPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheduled_call_date: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

/// CRM interaction reads and writes
pub struct CrmService {
    gateway: Arc<GatewayClient>,
    locks: EditLocks,
}

impl CrmService {
    pub fn new(gateway: Arc<GatewayClient>) -> Self {
        Self {
            gateway,
            locks: EditLocks::new(),
        }
    }

    fn table(&self) -> &str {
        &self.gateway.tables().crm_interactions
    }

    pub fn locks(&self) -> &EditLocks {
        &self.locks
    }

    /// Insert an interaction and return the refreshed list for its property
    ///
    /// Once the insert succeeds the call succeeds. A failed refresh returns
    /// the created row alone with an error notice.
    pub async fn create(&self, draft: InteractionDraft) -> Result<InteractionListResponse, CrmError> {
        let status = draft.status.unwrap_or_default();
        ensure_known(&status)?;

        let now = Utc::now();
        let row = NewCrmInteraction {
            id: Uuid::new_v4().to_string(),
            property_id: draft.property_id,
            status,
            notes: draft.notes.filter(|n| !n.trim().is_empty()),
            scheduled_call_date: draft.scheduled_call_date,
            created_at: now,
            updated_at: now,
        };

        let created: CrmInteraction = self.gateway.insert(self.table(), &row).await?;
        tracing::info!(
            "Created CRM interaction {} ({}) for {:?}",
            created.id,
            created.status,
            created.property_id
        );

        let refreshed = self.list(created.property_id.as_deref()).await;
        match refreshed {
            Ok(interactions) => Ok(InteractionListResponse::new(interactions)),
            Err(e) => {
                tracing::error!("Failed to refresh interactions after creating {}: {}", created.id, e);
                Ok(InteractionListResponse::new(vec![created]).with_notice(Notice::error(REFRESH_FAILED_NOTICE)))
            }
        }
    }

    /// Change only the status (and `updated_at`)
    pub async fn update_status(&self, id: &str, status: CrmStatus) -> Result<CrmInteraction, CrmError> {
        ensure_known(&status)?;
        let _guard = self.locks.try_lock(id).ok_or_else(|| CrmError::Busy(id.to_string()))?;

        let patch = StatusPatch {
            status: &status,
            updated_at: Utc::now(),
        };
        let updated = self.patch(id, &patch).await?;

        tracing::info!("CRM interaction {} moved to {}", id, status);
        Ok(updated)
    }

    /// Change notes and/or the scheduled call date
    pub async fn update_details(
        &self,
        id: &str,
        notes: Option<&str>,
        scheduled_call_date: Option<DateTime<Utc>>,
    ) -> Result<CrmInteraction, CrmError> {
        if notes.is_none() && scheduled_call_date.is_none() {
            return Err(CrmError::EmptyUpdate);
        }
        let _guard = self.locks.try_lock(id).ok_or_else(|| CrmError::Busy(id.to_string()))?;

        let patch = DetailsPatch {
            notes,
            scheduled_call_date,
            updated_at: Utc::now(),
        };
        let updated = self.patch(id, &patch).await?;

        tracing::info!("Updated details of CRM interaction {}", id);
        Ok(updated)
    }

    async fn patch<P: Serialize>(&self, id: &str, patch: &P) -> Result<CrmInteraction, CrmError> {
        self.gateway
            .update(self.table(), "id", id, patch)
            .await
            .map_err(|e| match e {
                GatewayError::NotFound(_) => CrmError::NotFound(id.to_string()),
                other => CrmError::Gateway(other),
            })
    }

    /// Interactions joined to their property, newest first
    pub async fn list(&self, property_id: Option<&str>) -> Result<Vec<CrmInteraction>, CrmError> {
        let mut query = TableQuery::new(self.table()).select(INTERACTION_SELECT);
        if let Some(property_id) = property_id {
            query = query.eq("property_id", property_id);
        }
        let query = query.order("created_at", false);

        Ok(self.gateway.select_all(&query).await?)
    }
}

fn ensure_known(status: &CrmStatus) -> Result<(), CrmError> {
    if status.is_known() {
        Ok(())
    } else {
        Err(CrmError::InvalidStatus(status.to_string()))
    }
}
