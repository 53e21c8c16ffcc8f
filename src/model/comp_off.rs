use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantStatus {
    Active,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantSource {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompOffGrant {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub work_date: NaiveDate,
    #[schema(example = 1.0)]
    pub duration: f64,
    pub status: GrantStatus,
    pub source: GrantSource,
    pub note: Option<String>,
    pub granted_by: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewCompOffGrant {
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub work_date: NaiveDate,
    #[schema(example = 1.0)]
    pub duration: f64,
    #[schema(example = "Release weekend")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrantDraft {
    pub user_id: u64,
    pub work_date: NaiveDate,
    pub duration: f64,
    pub source: GrantSource,
    pub note: Option<String>,
    pub granted_by: Option<u64>,
}
