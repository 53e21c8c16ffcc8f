use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use super::AppWorkflow;
use crate::auth::auth::AuthUser;
use crate::model::approval::RequestKind;
use crate::workflow::absence_sweep::SweepReport;
use crate::workflow::comp_off::CompOffReport;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RunDate {
    /// Defaults to yesterday in the business timezone
    #[schema(example = "2026-01-04", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
}

fn run_date(workflow: &AppWorkflow, body: RunDate) -> NaiveDate {
    body.date.unwrap_or_else(|| {
        let today = workflow.clock().today();
        today.pred_opt().unwrap_or(today)
    })
}

/// Re-run the absence sweep for one day (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/admin/absence-sweep",
    request_body = RunDate,
    responses(
        (status = 200, description = "Sweep finished", body = SweepReport),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn run_absence_sweep(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    payload: web::Json<RunDate>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let date = run_date(&workflow, payload.into_inner());
    let report = workflow.run_daily_absence_sweep(date).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// Re-run automatic comp-off detection for one day (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/admin/comp-off-detection",
    request_body = RunDate,
    responses(
        (status = 200, description = "Detection finished", body = CompOffReport),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn run_comp_off_detection(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    payload: web::Json<RunDate>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let date = run_date(&workflow, payload.into_inner());
    let report = workflow.detect_weekly_off_work(date).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// Re-aggregate a request's votes without casting a new one (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/admin/recompute/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "LEAVE or REIMBURSEMENT"),
        ("id" = u64, Path, description = "ID of the request")
    ),
    responses(
        (status = 200, description = "Current status", body = Object, example = json!({
            "status": "APPROVED"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn recompute(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<(RequestKind, u64)>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (kind, id) = path.into_inner();
    let status = workflow.recompute(kind, id).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": status })))
}

/// Drop the cached manager list of a department after reassignment (HR/Admin)
#[utoipa::path(
    delete,
    path = "/api/admin/directory/{department_id}",
    params(
        ("department_id" = u64, Path, description = "Department whose managers changed")
    ),
    responses(
        (status = 200, description = "Cache entry dropped", body = Object, example = json!({
            "message": "Department cache invalidated"
        })),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn invalidate_department(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let department_id = path.into_inner();
    workflow.directory().invalidate_department(department_id).await;
    tracing::info!(department_id, "Department manager cache invalidated");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Department cache invalidated"
    })))
}
