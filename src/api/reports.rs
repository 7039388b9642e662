//! Report API handlers.

use actix_web::{HttpResponse, web};
use tracing::info;
use uuid::Uuid;

use crate::auth::{SessionAuth, WebhookAuth};
use crate::db::ReportStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    ListReportsQuery, Report, ReportCallbackRequest, ReportListResponse, ReportPatch,
    ReportResponse, ReportStatus, SubmitReportRequest,
};
use crate::services::{ReportSubmitter, Requester};

/// Fetch a report the caller owns. Reports owned by someone else read as missing.
pub(crate) async fn find_owned_report(
    store: &dyn ReportStore,
    owner_id: &str,
    report_id: Uuid,
) -> AppResult<Report> {
    store
        .get(report_id)
        .await?
        .filter(|r| r.owner_id == owner_id)
        .ok_or_else(|| AppError::NotFound(format!("Report {}", report_id)))
}

/// Request a new competitor report.
///
/// Creates the report in `processing` and starts the workflow job. If the
/// workflow cannot be reached the report is stored as `error` and 502 is
/// returned.
#[utoipa::path(
    post,
    path = "/api/v1/reports",
    tag = "Reports",
    request_body = SubmitReportRequest,
    responses(
        (status = 201, description = "Report created and job started", body = ReportResponse),
        (status = 400, description = "Invalid LinkedIn URL", body = crate::error::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 502, description = "Workflow could not be triggered", body = crate::error::ErrorResponse),
    ),
    security(
        ("session" = [])
    )
)]
pub async fn submit_report(
    auth: SessionAuth,
    submitter: web::Data<ReportSubmitter>,
    body: web::Json<SubmitReportRequest>,
) -> AppResult<HttpResponse> {
    let requester = Requester {
        owner_id: auth.user.id,
        email: auth.user.email,
    };

    let report = submitter.submit(&requester, &body.linkedin_url).await?;

    Ok(HttpResponse::Created().json(ReportResponse::from(report)))
}

/// List the caller's reports, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/reports",
    tag = "Reports",
    params(
        ("limit" = Option<u64>, Query, description = "Results per page (default 20, max 100)"),
        ("offset" = Option<u64>, Query, description = "Pagination offset"),
    ),
    responses(
        (status = 200, description = "List of reports", body = ReportListResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    ),
    security(
        ("session" = [])
    )
)]
pub async fn list_reports(
    auth: SessionAuth,
    store: web::Data<dyn ReportStore>,
    query: web::Query<ListReportsQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let (reports, total) = store.list_for_owner(&auth.user.id, &query).await?;

    Ok(HttpResponse::Ok().json(ReportListResponse {
        reports: reports.into_iter().map(ReportResponse::from).collect(),
        total,
        limit: query.clamped_limit(),
        offset: query.offset,
    }))
}

/// Get one report owned by the caller.
#[utoipa::path(
    get,
    path = "/api/v1/reports/{report_id}",
    tag = "Reports",
    params(
        ("report_id" = Uuid, Path, description = "Report UUID")
    ),
    responses(
        (status = 200, description = "Report", body = ReportResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Report not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("session" = [])
    )
)]
pub async fn get_report(
    auth: SessionAuth,
    store: web::Data<dyn ReportStore>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let report = find_owned_report(store.get_ref(), &auth.user.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ReportResponse::from(report)))
}

/// Completion callback from the workflow engine.
///
/// Moves a processing report to `completed` (with its spreadsheet URL) or
/// `error`. Terminal reports are never rewritten.
#[utoipa::path(
    post,
    path = "/api/v1/reports/{report_id}/callback",
    tag = "Workflow",
    params(
        ("report_id" = Uuid, Path, description = "Report UUID")
    ),
    request_body = ReportCallbackRequest,
    responses(
        (status = 200, description = "Report updated", body = ReportResponse),
        (status = 400, description = "Invalid outcome", body = crate::error::ErrorResponse),
        (status = 401, description = "Bad or missing webhook secret", body = crate::error::ErrorResponse),
        (status = 404, description = "Report not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Report already finished", body = crate::error::ErrorResponse),
    ),
    security(
        ("webhook_secret" = [])
    )
)]
pub async fn report_callback(
    _auth: WebhookAuth,
    store: web::Data<dyn ReportStore>,
    path: web::Path<Uuid>,
    body: web::Json<ReportCallbackRequest>,
) -> AppResult<HttpResponse> {
    let report_id = path.into_inner();
    let patch = callback_patch(body.into_inner())?;

    let report = store.update(report_id, patch).await?;
    info!(
        report_id = %report_id,
        status = %report.status,
        "Workflow reported outcome"
    );

    Ok(HttpResponse::Ok().json(ReportResponse::from(report)))
}

fn callback_patch(body: ReportCallbackRequest) -> AppResult<ReportPatch> {
    match body.status {
        ReportStatus::Processing => Err(AppError::InvalidInput(
            "status must be completed or error".to_string(),
        )),
        ReportStatus::Error => Ok(ReportPatch::error()),
        ReportStatus::Completed => {
            let url = body
                .google_sheet_url
                .map(|u| u.trim().to_string())
                .filter(|u| is_http_url(u))
                .ok_or_else(|| {
                    AppError::InvalidInput(
                        "google_sheet_url must be an http(s) URL for completed reports"
                            .to_string(),
                    )
                })?;
            Ok(ReportPatch::completed(url))
        }
    }
}

fn is_http_url(url: &str) -> bool {
    ["https://", "http://"]
        .iter()
        .any(|scheme| url.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()))
}

/// Configure report routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/reports")
            .route(web::get().to(list_reports))
            .route(web::post().to(submit_report)),
    )
    .service(web::resource("/reports/{report_id}").route(web::get().to(get_report)))
    .service(
        web::resource("/reports/{report_id}/callback").route(web::post().to(report_callback)),
    );
}
