use crate::core::filters::{FilterAction, ALL};
use crate::models::{
    AvatarUploadResponse, CountResponse, FilterApplyRequest, ImageUploadResponse,
    SelectionRequest,
};
use crate::routes::{ApiError, AppState, StaffUser};
use actix_web::{web, HttpResponse};

/// Largest accepted image upload
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::post().to(dashboard))
        .route("/filters/options", web::post().to(filter_options))
        .route("/filters/apply", web::post().to(apply_filter))
        .route("/properties", web::post().to(list_properties))
        .route("/properties/count", web::post().to(count_properties))
        .service(
            web::resource("/properties/{property_id}/image")
                .app_data(web::PayloadConfig::new(MAX_IMAGE_BYTES))
                .route(web::put().to(upload_image)),
        )
        .service(
            web::resource("/me/avatar")
                .app_data(web::PayloadConfig::new(MAX_IMAGE_BYTES))
                .route(web::put().to(upload_avatar)),
        );
}

/// File extension and content type of an accepted upload
fn image_kind(body: &[u8]) -> Result<(&'static str, &'static str), ApiError> {
    match image::guess_format(body) {
        Ok(image::ImageFormat::Jpeg) => Ok(("jpg", "image/jpeg")),
        Ok(image::ImageFormat::Png) => Ok(("png", "image/png")),
        Ok(image::ImageFormat::WebP) => Ok(("webp", "image/webp")),
        _ => Err(ApiError::BadRequest(
            "image must be JPEG, PNG or WebP".to_string(),
        )),
    }
}

/// Options, rows, map view and aggregates in one call
///
/// POST /api/v1/dashboard
///
/// Always 200: failed sub-queries show up in `notices`.
async fn dashboard(
    state: web::Data<AppState>,
    _user: StaffUser,
    req: web::Json<SelectionRequest>,
) -> HttpResponse {
    let response = state.properties.dashboard(&req.selection).await;
    HttpResponse::Ok().json(response)
}

/// Cities, zips and scores available for the current selection
///
/// POST /api/v1/filters/options
///
/// Always 200: a failed list comes back empty with a notice.
async fn filter_options(
    state: web::Data<AppState>,
    _user: StaffUser,
    req: web::Json<SelectionRequest>,
) -> HttpResponse {
    let response = state.properties.filter_options(&req.selection).await;
    HttpResponse::Ok().json(response)
}

/// Apply one edit to a selection and return the result
///
/// POST /api/v1/filters/apply
///
/// Request body:
/// ```json
/// {
///   "selection": { "cities": [], "zips": [], "scores": [], "price": { "min": 250000, "max": 2500000 } },
///   "action": { "type": "toggle", "dimension": "city", "value": "all" }
/// }
/// ```
async fn apply_filter(
    state: web::Data<AppState>,
    _user: StaffUser,
    req: web::Json<FilterApplyRequest>,
) -> Result<HttpResponse, ApiError> {
    let FilterApplyRequest { mut selection, action } = req.into_inner();

    let available = match &action {
        FilterAction::Toggle { dimension, value } if value == ALL => {
            state.properties.available_values(*dimension, &selection).await?
        }
        _ => Vec::new(),
    };

    selection.apply(&action, &available)?;
    tracing::debug!("Applied {:?}", action);

    Ok(HttpResponse::Ok().json(selection))
}

/// POST /api/v1/properties
async fn list_properties(
    state: web::Data<AppState>,
    _user: StaffUser,
    req: web::Json<SelectionRequest>,
) -> Result<HttpResponse, ApiError> {
    let properties = state.properties.properties(&req.selection).await?;
    Ok(HttpResponse::Ok().json(properties))
}

/// POST /api/v1/properties/count
async fn count_properties(
    state: web::Data<AppState>,
    _user: StaffUser,
    req: web::Json<SelectionRequest>,
) -> Result<HttpResponse, ApiError> {
    let total_count = state.properties.total_count(&req.selection).await?;
    Ok(HttpResponse::Ok().json(CountResponse { total_count }))
}

/// Store a property photo under its conventional file name
///
/// PUT /api/v1/properties/{property_id}/image (raw JPEG, PNG or WebP body)
async fn upload_image(
    state: web::Data<AppState>,
    user: StaffUser,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let property_id = path.into_inner();

    let (extension, content_type) = image_kind(&body)?;

    let key = format!("{}.{}", property_id, extension);
    let url = state
        .store
        .upload(&state.image_bucket, &key, body.to_vec(), content_type)
        .await?;

    tracing::info!("Staff {} uploaded image {} for {}", user.id, key, property_id);

    Ok(HttpResponse::Ok().json(ImageUploadResponse { property_id, url }))
}

/// Replace the signed-in staff member's avatar
///
/// PUT /api/v1/me/avatar (raw JPEG, PNG or WebP body)
async fn upload_avatar(
    state: web::Data<AppState>,
    user: StaffUser,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let (extension, content_type) = image_kind(&body)?;

    let key = format!("{}.{}", user.id, extension);
    let url = state
        .store
        .upload(&state.avatar_bucket, &key, body.to_vec(), content_type)
        .await?;

    tracing::info!("Staff {} replaced their avatar", user.id);

    Ok(HttpResponse::Ok().json(AvatarUploadResponse { user_id: user.id, url }))
}
