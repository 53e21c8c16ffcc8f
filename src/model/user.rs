use serde::Serialize;
use utoipa::ToSchema;

use crate::model::period::YearMonth;
use crate::model::role::Role;

/// Identity-owned user row. Only the three ledger fields are written here.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub role: Role,
    pub is_active: bool,
    pub leave_balance: f64,
    pub comp_off_balance: f64,
    pub last_leave_credit_period: Option<YearMonth>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Balances {
    #[schema(example = 4.5)]
    pub leave_balance: f64,
    #[schema(example = 1.0)]
    pub comp_off_balance: f64,
    /// Leave units credited by the accrual run triggered by this call.
    #[schema(example = 0.0)]
    pub credited_this_call: f64,
}
