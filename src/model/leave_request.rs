use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::approval::RequestStatus;
use crate::model::attendance::AttendanceStatus;
use crate::model::period::DateSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveType {
    Paid,
    Unpaid,
    Sick,
    Casual,
    HalfDay,
    Wfh,
    CompOff,
}

/// Which balance an approved request draws from, and how much.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Charge {
    Leave(f64),
    CompOff(f64),
    Free,
}

impl LeaveType {
    /// Days shown to people; half-day counts as 0.5.
    pub fn day_count(self, span: &DateSpan) -> f64 {
        match self {
            LeaveType::HalfDay => 0.5,
            _ => span.day_count() as f64,
        }
    }

    pub fn charge(self, span: &DateSpan) -> Charge {
        match self {
            LeaveType::Wfh | LeaveType::Unpaid => Charge::Free,
            LeaveType::CompOff => Charge::CompOff(self.day_count(span)),
            _ => Charge::Leave(self.day_count(span)),
        }
    }

    /// Draws from `leave_balance`.
    pub fn is_chargeable(self) -> bool {
        !matches!(self, LeaveType::Wfh | LeaveType::Unpaid | LeaveType::CompOff)
    }

    pub fn attendance_status(self) -> AttendanceStatus {
        match self {
            LeaveType::Wfh => AttendanceStatus::Wfh,
            LeaveType::HalfDay => AttendanceStatus::HalfDay,
            LeaveType::CompOff => AttendanceStatus::CompOff,
            _ => AttendanceStatus::Leave,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub owner_id: u64,
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    pub admin_deleted: bool,
    pub employee_deleted: bool,
    pub responsible_person_id: Option<u64>,
    /// Set only on rows created by the absence sweep.
    #[schema(format = "date", value_type = Option<String>)]
    pub auto_absence_date: Option<NaiveDate>,
    #[schema(example = "2026-01-01T00:00:00", format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
}

impl LeaveRequest {
    pub fn span(&self) -> DateSpan {
        DateSpan {
            start: self.start_date,
            end: self.end_date,
        }
    }

    pub fn day_count(&self) -> f64 {
        self.leave_type.day_count(&self.span())
    }

    pub fn charge(&self) -> Charge {
        self.leave_type.charge(&self.span())
    }

    pub fn is_deleted(&self) -> bool {
        self.admin_deleted || self.employee_deleted
    }

    /// Counts against the no-overlap rule.
    pub fn is_active(&self) -> bool {
        !self.is_deleted() && self.status != RequestStatus::Rejected
    }
}

/// Insert shape shared by submissions and the absence sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveDraft {
    pub owner_id: u64,
    pub leave_type: LeaveType,
    pub span: DateSpan,
    pub reason: Option<String>,
    pub status: RequestStatus,
    pub responsible_person_id: Option<u64>,
    pub auto_absence_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewLeave {
    #[schema(example = "SICK")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Fever")]
    pub reason: Option<String>,
    pub responsible_person_id: Option<u64>,
}

/// Partial edit of a leave request.
///
/// `status`, `owner_id` and `rejection_reason` are dropped when the editor
/// is the owner rather than an administrator.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LeavePatch {
    pub leave_type: Option<LeaveType>,
    #[schema(format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub responsible_person_id: Option<u64>,
    pub status: Option<RequestStatus>,
    pub owner_id: Option<u64>,
    pub approver_id: Option<u64>,
    pub rejection_reason: Option<String>,
}

impl LeavePatch {
    pub fn strip_privileged(mut self) -> Self {
        self.status = None;
        self.owner_id = None;
        self.approver_id = None;
        self.rejection_reason = None;
        self
    }
}
