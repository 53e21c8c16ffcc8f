use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

use super::{AppWorkflow, DecisionNote};
use crate::auth::auth::AuthUser;
use crate::model::approval::{Decision, RequestKind};
use crate::model::leave_request::{LeavePatch, LeaveRequest, NewLeave};
use crate::workflow::submission::{LeaveDetail, LeaveFilter, LeavePage, RequestPayload, SubmitReceipt};

/* =========================
Create leave request
========================= */
/// Swagger doc for create_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = NewLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted successfully", body = SubmitReceipt),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Insufficient balance or overlapping request", body = Object, example = json!({
            "message": "dates overlap leave request #12",
            "error": "OverlapConflict"
        })),
        (status = 422, description = "No manager assigned")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    payload: web::Json<NewLeave>,
) -> actix_web::Result<impl Responder> {
    let receipt = workflow
        .submit_request(&auth.actor(), RequestPayload::Leave(payload.into_inner()))
        .await?;
    Ok(HttpResponse::Created().json(receipt))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeavePage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let page = workflow
        .list_leaves(&auth.actor(), query.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request with its approval slots", body = LeaveDetail),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "leave request not found",
            "error": "NotFound"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let detail = workflow
        .get_leave(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Edit a leave request; owners only while it is pending
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to edit")
    ),
    request_body = LeavePatch,
    responses(
        (status = 200, description = "Leave request updated", body = LeaveRequest),
        (status = 400, description = "Bad request"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Overlapping request")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn update_leave(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
    payload: web::Json<LeavePatch>,
) -> actix_web::Result<impl Responder> {
    let leave = workflow
        .update_leave(&auth.actor(), path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(leave))
}

/// Soft-delete a leave request
#[utoipa::path(
    delete,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to delete")
    ),
    responses(
        (status = 200, description = "Leave request deleted", body = Object, example = json!({
            "message": "Leave request deleted"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    workflow
        .delete_leave(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave request deleted"
    })))
}

/* =========================
Approve leave (assigned manager or HR/Admin)
========================= */
/// Swagger doc for approve_leave endpoint
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Vote recorded", body = Object, example = json!({
            "message": "Vote recorded",
            "status": "APPROVED"
        })),
        (status = 403, description = "Not an approver of this request"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Insufficient balance at approval time")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let status = workflow
        .act_on_request(
            &auth.actor(),
            RequestKind::Leave,
            path.into_inner(),
            Decision::Approve,
            None,
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Vote recorded",
        "status": status
    })))
}

/* =========================
Reject leave (assigned manager or HR/Admin)
========================= */
/// Swagger doc for reject_leave endpoint
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body = DecisionNote,
    responses(
        (status = 200, description = "Vote recorded", body = Object, example = json!({
            "message": "Vote recorded",
            "status": "REJECTED"
        })),
        (status = 403, description = "Not an approver of this request"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
    payload: web::Json<DecisionNote>,
) -> actix_web::Result<impl Responder> {
    let status = workflow
        .act_on_request(
            &auth.actor(),
            RequestKind::Leave,
            path.into_inner(),
            Decision::Reject,
            payload.into_inner().reason,
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Vote recorded",
        "status": status
    })))
}
