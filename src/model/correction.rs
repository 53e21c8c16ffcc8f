use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::approval::RequestStatus;

/// Employee's claim that they were present on a day recorded as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceCorrection {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "09:00:00", value_type = String)]
    pub check_in: NaiveTime,
    #[schema(example = "18:00:00", value_type = String)]
    pub check_out: NaiveTime,
    pub witness_id: u64,
    pub reason: String,
    pub status: RequestStatus,
    pub decided_by: Option<u64>,
    pub decision_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewCorrection {
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "09:00:00", value_type = String)]
    pub check_in: NaiveTime,
    #[schema(example = "18:00:00", value_type = String)]
    pub check_out: NaiveTime,
    #[schema(example = 1001)]
    pub witness_id: u64,
    #[schema(example = "Badge reader was down")]
    pub reason: String,
}
