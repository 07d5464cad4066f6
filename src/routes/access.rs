use crate::models::{AccessRequest, AccessRequestForm, AccessRequestResponse};
use crate::routes::{ApiError, AppState};
use actix_web::{web, HttpResponse};
use validator::Validate;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/access-requests", web::post().to(submit_access_request));
}

/// Public access request form
///
/// POST /api/v1/access-requests
///
/// Request body:
/// ```json
/// { "first_name": "string", "last_name": "string", "email": "string", "phone": "string?" }
/// ```
async fn submit_access_request(
    state: web::Data<AppState>,
    form: web::Json<AccessRequestForm>,
) -> Result<HttpResponse, ApiError> {
    let form = form.into_inner().trimmed();
    if let Err(errors) = form.validate() {
        tracing::info!("Access request rejected: {:?}", errors.field_errors().keys());
        return Err(errors.into());
    }

    let request = AccessRequest {
        id: uuid::Uuid::new_v4().to_string(),
        first_name: form.first_name,
        last_name: form.last_name,
        email: form.email,
        phone: form.phone,
        created_at: chrono::Utc::now(),
    };

    let stored: AccessRequest = state
        .gateway
        .insert(&state.gateway.tables().access_requests, &request)
        .await?;

    tracing::info!("Access request {} received", stored.id);

    Ok(HttpResponse::Created().json(AccessRequestResponse {
        id: stored.id,
        message: "Request received. We will be in touch shortly.".to_string(),
    }))
}
