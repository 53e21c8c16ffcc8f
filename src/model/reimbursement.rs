use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::approval::RequestStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Reimbursement {
    pub id: u64,
    pub owner_id: u64,
    #[schema(example = 1250.0)]
    pub amount: f64,
    #[schema(example = "TRAVEL")]
    pub category: String,
    pub description: String,
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub expense_date: NaiveDate,
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    #[schema(example = "2026-01-05T10:00:00", format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewReimbursement {
    #[schema(example = 1250.0)]
    pub amount: f64,
    #[schema(example = "TRAVEL")]
    pub category: String,
    #[schema(example = "Client visit cab fare")]
    pub description: String,
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub expense_date: NaiveDate,
}
