use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::{Value, json};

/// Resolves the caller from an `Authorization` header value.
fn authenticate(header: Option<&str>, secret: &str) -> Result<AuthUser, Value> {
    let header = header.ok_or_else(|| json!({"error": "Missing Authorization header"}))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| json!({"error": "Authorization header must start with Bearer"}))?;

    let claims = verify_token(token, secret)
        .map_err(|e| json!({"error": "Invalid or expired token", "details": e}))?;
    let role = Role::from_id(claims.role).ok_or_else(|| json!({"error": "Invalid role"}))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
    })
}

/// Verifies the bearer token and stores the caller as an [`AuthUser`].
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header = match req.headers().get("Authorization") {
        Some(h) => Some(h.to_str().map_err(|_| {
            actix_web::error::ErrorUnauthorized(
                json!({"error": "Invalid Authorization header encoding"}),
            )
        })?),
        None => None,
    };

    match authenticate(header, &config.jwt_secret) {
        Ok(auth_user) => {
            tracing::debug!(user_id = auth_user.user_id, role = ?auth_user.role, "Request authenticated");
            req.extensions_mut().insert(auth_user);
            next.call(req).await
        }
        Err(body) => {
            tracing::debug!(path = req.path(), "Request rejected by auth middleware");
            let resp = HttpResponse::Unauthorized().json(body);
            Ok(req.into_response(resp.map_into_boxed_body()))
        }
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;
    use crate::auth::jwt::Claims;

    const SECRET: &str = "s3cret";

    fn bearer(role: u8) -> String {
        let claims = Claims {
            user_id: 7,
            sub: "hr.lead".to_string(),
            role,
            exp: 4_102_444_800,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes()))
            .expect("token encodes");
        format!("Bearer {token}")
    }

    #[test]
    fn valid_bearer_yields_the_caller() {
        let user = authenticate(Some(&bearer(2)), SECRET).expect("authenticated");
        assert_eq!(user.user_id, 7);
        assert_eq!(user.username, "hr.lead");
        assert_eq!(user.role, Role::Hr);
    }

    #[test]
    fn malformed_headers_are_unauthorized() {
        assert_eq!(
            authenticate(None, SECRET).unwrap_err()["error"],
            "Missing Authorization header"
        );
        let raw = bearer(2).replace("Bearer ", "Token ");
        assert_eq!(
            authenticate(Some(&raw), SECRET).unwrap_err()["error"],
            "Authorization header must start with Bearer"
        );
        assert_eq!(authenticate(Some(&bearer(9)), SECRET).unwrap_err()["error"], "Invalid role");
    }
}
