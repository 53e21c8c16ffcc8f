use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use super::AppWorkflow;
use crate::auth::auth::AuthUser;
use crate::model::comp_off::{CompOffGrant, NewCompOffGrant};

#[derive(Debug, Deserialize, IntoParams)]
pub struct GrantQuery {
    /// Defaults to the caller
    pub user_id: Option<u64>,
}

/// Grant comp-off for work on a non-working day (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/comp-off",
    request_body = NewCompOffGrant,
    responses(
        (status = 201, description = "Comp-off granted", body = CompOffGrant),
        (status = 400, description = "Bad request"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "CompOff"
)]
pub async fn grant_comp_off(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    payload: web::Json<NewCompOffGrant>,
) -> actix_web::Result<impl Responder> {
    let grant = workflow
        .grant_comp_off(&auth.actor(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(grant))
}

#[utoipa::path(
    get,
    path = "/api/comp-off",
    params(GrantQuery),
    responses(
        (status = 200, description = "Comp-off grants, newest work date first", body = Vec<CompOffGrant>),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "CompOff"
)]
pub async fn list_comp_off(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    query: web::Query<GrantQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = query.user_id.unwrap_or(auth.user_id);
    let grants = workflow
        .list_comp_off_grants(&auth.actor(), user_id)
        .await?;
    Ok(HttpResponse::Ok().json(grants))
}

/// Delete a grant and take its units back (HR/Admin)
#[utoipa::path(
    delete,
    path = "/api/comp-off/{id}",
    params(
        ("id" = u64, Path, description = "ID of the grant to delete")
    ),
    responses(
        (status = 200, description = "Grant deleted", body = Object, example = json!({
            "message": "Comp-off grant deleted"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Grant not found"),
        (status = 409, description = "Units already used")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "CompOff"
)]
pub async fn delete_comp_off(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    workflow
        .delete_comp_off_grant(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Comp-off grant deleted"
    })))
}
