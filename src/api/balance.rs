use actix_web::{HttpResponse, Responder, web};

use super::AppWorkflow;
use crate::auth::auth::AuthUser;
use crate::model::user::Balances;

/// Caller's balances; runs the monthly accrual first
#[utoipa::path(
    get,
    path = "/api/balance",
    responses(
        (status = 200, description = "Current balances", body = Balances),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found or inactive")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Balance"
)]
pub async fn my_balance(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
) -> actix_web::Result<impl Responder> {
    let balances = workflow.get_balances(&auth.actor(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(balances))
}

#[utoipa::path(
    get,
    path = "/api/balance/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User whose balances to read")
    ),
    responses(
        (status = 200, description = "Current balances", body = Balances),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found or inactive")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Balance"
)]
pub async fn user_balance(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let balances = workflow
        .get_balances(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(balances))
}
