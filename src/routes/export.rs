use crate::core::csv::to_csv;
use crate::models::{CsvExportRequest, ExportPdfRequest};
use crate::routes::{ApiError, AppState, StaffUser};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/export/pdf", web::post().to(export_pdf))
        .route("/export/jobs/{id}", web::get().to(export_job))
        .route("/export/jobs/{id}/archive", web::get().to(export_archive))
        .route("/export/csv", web::post().to(export_csv));
}

fn attachment(filename: String) -> ContentDisposition {
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(filename)],
    }
}

/// Report export
///
/// POST /api/v1/export/pdf
///
/// One id answers with the PDF itself. Several ids start a background job
/// (202 with the job); poll `/export/jobs/{id}` and fetch the archive once
/// it completes.
async fn export_pdf(
    state: web::Data<AppState>,
    user: StaffUser,
    req: web::Json<ExportPdfRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let property_ids = req.into_inner().property_ids;

    if let [property_id] = property_ids.as_slice() {
        let (filename, pdf) = state.export.single_report(property_id).await?;
        return Ok(HttpResponse::Ok()
            .content_type("application/pdf")
            .insert_header(attachment(filename))
            .body(pdf));
    }

    let job = state.export.clone().start_batch(property_ids).await?;
    tracing::info!("Staff {} started export job {}", user.id, job.id);

    Ok(HttpResponse::Accepted().json(job))
}

/// GET /api/v1/export/jobs/{id}
async fn export_job(
    state: web::Data<AppState>,
    _user: StaffUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let job = state
        .export
        .jobs()
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("export job not found: {}", id)))?;
    Ok(HttpResponse::Ok().json(job))
}

/// GET /api/v1/export/jobs/{id}/archive
async fn export_archive(
    state: web::Data<AppState>,
    _user: StaffUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let archive = state.export.jobs().archive(id).await?;

    Ok(HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header(attachment(format!("reports_{}.zip", id)))
        .body(archive.as_ref().clone()))
}

/// Every property matching the selection as CSV
///
/// POST /api/v1/export/csv
async fn export_csv(
    state: web::Data<AppState>,
    _user: StaffUser,
    req: web::Json<CsvExportRequest>,
) -> Result<HttpResponse, ApiError> {
    let properties = state.properties.properties(&req.selection).await?;

    let excluded: Vec<&str> = if req.include_all_columns {
        Vec::new()
    } else {
        state.csv_excluded_columns.iter().map(String::as_str).collect()
    };

    let csv = to_csv(&properties, &excluded).map_err(|e| ApiError::Internal(e.to_string()))?;
    let filename = format!("properties_{}.csv", chrono::Utc::now().format("%Y-%m-%d"));
    tracing::info!("CSV export of {} properties", properties.len());

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(attachment(filename))
        .body(csv))
}
