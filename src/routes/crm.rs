use crate::core::crm::{self, status_tag};
use crate::models::{
    CreateInteractionRequest, CrmStatsResponse, CrmStatus, InteractionListQuery, InteractionListResponse,
    InteractionView, UpdateDetailsRequest, UpdateStatusRequest,
};
use crate::routes::{ApiError, AppState, StaffUser};
use crate::services::InteractionDraft;
use actix_web::{web, HttpResponse};
use validator::Validate;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/crm/interactions", web::get().to(list_interactions))
        .route("/crm/interactions", web::post().to(create_interaction))
        .route("/crm/interactions/{id}", web::patch().to(update_details))
        .route("/crm/interactions/{id}/status", web::patch().to(update_status))
        .route("/crm/stats", web::get().to(interaction_stats))
        .route("/crm/statuses", web::get().to(list_statuses));
}

fn parse_status(raw: &str) -> Result<CrmStatus, ApiError> {
    CrmStatus::parse_known(raw).ok_or_else(|| ApiError::BadRequest(format!("unknown status: {}", raw)))
}

/// GET /api/v1/crm/interactions?property_id=...
async fn list_interactions(
    state: web::Data<AppState>,
    _user: StaffUser,
    query: web::Query<InteractionListQuery>,
) -> Result<HttpResponse, ApiError> {
    let interactions = state.crm.list(query.property_id.as_deref()).await?;
    Ok(HttpResponse::Ok().json(InteractionListResponse::new(interactions)))
}

/// Create an interaction; answers with the property's refreshed list
///
/// POST /api/v1/crm/interactions
///
/// Request body:
/// ```json
/// { "property_id": "string?", "status": "contacted", "notes": "string?", "scheduled_call_date": "RFC 3339?" }
/// ```
async fn create_interaction(
    state: web::Data<AppState>,
    user: StaffUser,
    req: web::Json<CreateInteractionRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let req = req.into_inner();

    let status = req.status.as_deref().map(parse_status).transpose()?;
    let response = state
        .crm
        .create(InteractionDraft {
            property_id: req.property_id,
            status,
            notes: req.notes,
            scheduled_call_date: req.scheduled_call_date,
        })
        .await?;

    tracing::debug!("Interaction created by {}", user.id);

    Ok(HttpResponse::Created().json(response))
}

/// PATCH /api/v1/crm/interactions/{id}/status
///
/// 409 while another edit of the same interaction is in flight.
async fn update_status(
    state: web::Data<AppState>,
    _user: StaffUser,
    path: web::Path<String>,
    req: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let status = parse_status(&req.status)?;
    let updated = state.crm.update_status(&path, status).await?;
    Ok(HttpResponse::Ok().json(InteractionView::from(updated)))
}

/// PATCH /api/v1/crm/interactions/{id}
async fn update_details(
    state: web::Data<AppState>,
    _user: StaffUser,
    path: web::Path<String>,
    req: web::Json<UpdateDetailsRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let updated = state
        .crm
        .update_details(&path, req.notes.as_deref(), req.scheduled_call_date)
        .await?;
    Ok(HttpResponse::Ok().json(InteractionView::from(updated)))
}

/// GET /api/v1/crm/stats?property_id=...
async fn interaction_stats(
    state: web::Data<AppState>,
    _user: StaffUser,
    query: web::Query<InteractionListQuery>,
) -> Result<HttpResponse, ApiError> {
    let interactions = state.crm.list(query.property_id.as_deref()).await?;
    let stats = crm::summarize(&interactions, chrono::Utc::now());

    Ok(HttpResponse::Ok().json(CrmStatsResponse {
        stats,
        statuses: CrmStatus::ALL.iter().map(status_tag).collect(),
    }))
}

/// The fixed status set with display labels and colors
async fn list_statuses(_user: StaffUser) -> HttpResponse {
    let tags: Vec<_> = CrmStatus::ALL.iter().map(status_tag).collect();
    HttpResponse::Ok().json(tags)
}
