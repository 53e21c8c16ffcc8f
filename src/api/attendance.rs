use actix_web::{HttpResponse, Responder, web};

use super::{AppWorkflow, DecisionNote};
use crate::auth::auth::AuthUser;
use crate::model::approval::Decision;
use crate::model::correction::{AttendanceCorrection, NewCorrection};

/// Ask for a day recorded as absent to be marked present
#[utoipa::path(
    post,
    path = "/api/attendance/corrections",
    request_body = NewCorrection,
    responses(
        (status = 201, description = "Correction filed", body = AttendanceCorrection),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn request_correction(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    payload: web::Json<NewCorrection>,
) -> actix_web::Result<impl Responder> {
    let correction = workflow
        .request_correction(&auth.actor(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(correction))
}

/// Approve a correction (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/attendance/corrections/{id}/approve",
    params(
        ("id" = u64, Path, description = "ID of the correction")
    ),
    responses(
        (status = 200, description = "Correction approved", body = AttendanceCorrection),
        (status = 400, description = "Already decided"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Correction not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn approve_correction(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let correction = workflow
        .decide_correction(&auth.actor(), path.into_inner(), Decision::Approve, None)
        .await?;
    Ok(HttpResponse::Ok().json(correction))
}

/// Reject a correction (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/attendance/corrections/{id}/reject",
    params(
        ("id" = u64, Path, description = "ID of the correction")
    ),
    request_body = DecisionNote,
    responses(
        (status = 200, description = "Correction rejected", body = AttendanceCorrection),
        (status = 400, description = "Already decided"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Correction not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn reject_correction(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
    payload: web::Json<DecisionNote>,
) -> actix_web::Result<impl Responder> {
    let correction = workflow
        .decide_correction(
            &auth.actor(),
            path.into_inner(),
            Decision::Reject,
            payload.into_inner().reason,
        )
        .await?;
    Ok(HttpResponse::Ok().json(correction))
}
