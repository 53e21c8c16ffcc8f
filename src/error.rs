use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::store::StoreError;

/// Failures surfaced by the workflow. Business-rule variants are raised
/// before anything is written.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("insufficient {balance} balance: requested {requested}, available {available}")]
    BalanceInsufficient {
        balance: &'static str,
        requested: f64,
        available: f64,
    },
    #[error("dates overlap leave request #{0}")]
    OverlapConflict(u64),
    #[error("no manager is assigned to any of your departments")]
    NoApprover,
    #[error("you are not an approver of this request")]
    NotAnApprover,
    #[error("you cannot act on your own request")]
    SelfApprovalForbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "ValidationError",
            ServiceError::BalanceInsufficient { .. } => "BalanceInsufficient",
            ServiceError::OverlapConflict(_) => "OverlapConflict",
            ServiceError::NoApprover => "NoApprover",
            ServiceError::NotAnApprover => "NotAnApprover",
            ServiceError::SelfApprovalForbidden => "SelfApprovalForbidden",
            ServiceError::NotFound(_) => "NotFound",
            ServiceError::Forbidden(_) => "Forbidden",
            ServiceError::Persistence(_) => "InternalPersistenceError",
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::BalanceInsufficient { .. } | ServiceError::OverlapConflict(_) => {
                StatusCode::CONFLICT
            }
            ServiceError::NoApprover => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::NotAnApprover
            | ServiceError::SelfApprovalForbidden
            | ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ServiceError::Persistence(e) => {
                tracing::error!(error = %e, "Persistence failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "message": message,
            "error": self.kind(),
        }))
    }
}
