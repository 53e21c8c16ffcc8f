use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

use super::{AppWorkflow, DecisionNote};
use crate::auth::auth::AuthUser;
use crate::model::approval::{Decision, RequestKind};
use crate::model::reimbursement::NewReimbursement;
use crate::workflow::submission::{ReimbursementDetail, RequestPayload, SubmitReceipt};

/// Submit a reimbursement claim
#[utoipa::path(
    post,
    path = "/api/reimbursement",
    request_body = NewReimbursement,
    responses(
        (status = 201, description = "Claim submitted", body = SubmitReceipt),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "No manager assigned")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reimbursement"
)]
pub async fn create_reimbursement(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    payload: web::Json<NewReimbursement>,
) -> actix_web::Result<impl Responder> {
    let receipt = workflow
        .submit_request(
            &auth.actor(),
            RequestPayload::Reimbursement(payload.into_inner()),
        )
        .await?;
    Ok(HttpResponse::Created().json(receipt))
}

#[utoipa::path(
    get,
    path = "/api/reimbursement/{id}",
    params(
        ("id" = u64, Path, description = "ID of the reimbursement")
    ),
    responses(
        (status = 200, description = "Claim with its approval slots", body = ReimbursementDetail),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Claim not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reimbursement"
)]
pub async fn get_reimbursement(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let detail = workflow
        .get_reimbursement(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    put,
    path = "/api/reimbursement/{id}/approve",
    params(
        ("id" = u64, Path, description = "ID of the reimbursement to approve")
    ),
    responses(
        (status = 200, description = "Vote recorded", body = Object, example = json!({
            "message": "Vote recorded",
            "status": "PENDING"
        })),
        (status = 403, description = "Not an approver of this claim"),
        (status = 404, description = "Claim not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reimbursement"
)]
pub async fn approve_reimbursement(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let status = workflow
        .act_on_request(
            &auth.actor(),
            RequestKind::Reimbursement,
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

#[utoipa::path(
    put,
    path = "/api/reimbursement/{id}/reject",
    params(
        ("id" = u64, Path, description = "ID of the reimbursement to reject")
    ),
    request_body = DecisionNote,
    responses(
        (status = 200, description = "Vote recorded", body = Object, example = json!({
            "message": "Vote recorded",
            "status": "REJECTED"
        })),
        (status = 403, description = "Not an approver of this claim"),
        (status = 404, description = "Claim not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reimbursement"
)]
pub async fn reject_reimbursement(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
    payload: web::Json<DecisionNote>,
) -> actix_web::Result<impl Responder> {
    let status = workflow
        .act_on_request(
            &auth.actor(),
            RequestKind::Reimbursement,
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
