//! Storage seam for the approval workflow.
//!
//! A [`StoreTx`] is one database transaction: every read that feeds a
//! decision and every write that follows from it go through the same
//! handle, and dropping the handle without [`StoreTx::commit`] rolls back.

#[cfg(test)]
pub mod memory;
pub mod mysql;

use chrono::{NaiveDate, NaiveDateTime};

use crate::model::approval::{ApprovalRecord, ApproverRole, RequestKind, RequestStatus};
use crate::model::attendance::Attendance;
use crate::model::calendar::{Holiday, WeeklyOff};
use crate::model::comp_off::{CompOffGrant, GrantDraft};
use crate::model::correction::{AttendanceCorrection, NewCorrection};
use crate::model::leave_request::{LeaveDraft, LeaveRequest};
use crate::model::period::YearMonth;
use crate::model::reimbursement::{NewReimbursement, Reimbursement};
use crate::model::user::User;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// How an accrual run rewrites `leave_balance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CreditMode {
    Add(f64),
    Reset(f64),
}

#[derive(Debug, Clone, Default)]
pub struct LeaveQuery {
    pub owner_id: Option<u64>,
    pub status: Option<RequestStatus>,
    /// Employees do not see rows they deleted themselves.
    pub hide_employee_deleted: bool,
    pub limit: u64,
    pub offset: u64,
}

#[allow(async_fn_in_trait)]
pub trait Store: Send + Sync {
    type Tx<'a>: StoreTx
    where
        Self: 'a;

    async fn begin(&self) -> Result<Self::Tx<'_>, StoreError>;
}

#[allow(async_fn_in_trait)]
pub trait StoreTx {
    async fn commit(self) -> Result<(), StoreError>;

    // users and ledger

    /// Reads the user and holds its row for the rest of the transaction.
    async fn lock_user(&mut self, user_id: u64) -> Result<Option<User>, StoreError>;
    /// Plain read, no row lock.
    async fn user(&mut self, user_id: u64) -> Result<Option<User>, StoreError>;
    /// Active users other than administrators.
    async fn active_staff(&mut self) -> Result<Vec<User>, StoreError>;
    /// Applies the credit only while the stored marker still equals
    /// `expected`. Returns false when another run got there first.
    async fn apply_leave_credit(
        &mut self,
        user_id: u64,
        expected: Option<YearMonth>,
        next: YearMonth,
        mode: CreditMode,
    ) -> Result<bool, StoreError>;
    /// Adds `delta` unless the result would be negative.
    async fn adjust_leave_balance(&mut self, user_id: u64, delta: f64) -> Result<bool, StoreError>;
    async fn adjust_comp_off_balance(&mut self, user_id: u64, delta: f64)
    -> Result<bool, StoreError>;

    // directory

    async fn departments_of(&mut self, user_id: u64) -> Result<Vec<u64>, StoreError>;
    async fn department_managers(&mut self, department_id: u64) -> Result<Vec<u64>, StoreError>;
    async fn managed_departments(&mut self, user_id: u64) -> Result<Vec<u64>, StoreError>;

    // leave requests

    async fn insert_leave(&mut self, draft: &LeaveDraft) -> Result<u64, StoreError>;
    /// Inserts an auto-unpaid row; `None` when one already exists for the
    /// owner and date.
    async fn insert_auto_absence(&mut self, draft: &LeaveDraft) -> Result<Option<u64>, StoreError>;
    async fn lock_leave(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError>;
    async fn save_leave(&mut self, leave: &LeaveRequest) -> Result<(), StoreError>;
    /// Non-deleted requests of the owner in one of `statuses`.
    async fn leaves_of(
        &mut self,
        owner_id: u64,
        statuses: &[RequestStatus],
    ) -> Result<Vec<LeaveRequest>, StoreError>;
    async fn list_leaves(&mut self, query: &LeaveQuery) -> Result<(Vec<LeaveRequest>, i64), StoreError>;

    // approval slots

    async fn insert_approval(&mut self, record: &ApprovalRecord) -> Result<(), StoreError>;
    async fn approvals(
        &mut self,
        kind: RequestKind,
        request_id: u64,
    ) -> Result<Vec<ApprovalRecord>, StoreError>;
    /// Writes the vote into the existing slot, or creates it.
    async fn upsert_vote(
        &mut self,
        kind: RequestKind,
        request_id: u64,
        approver_id: u64,
        role: ApproverRole,
        status: RequestStatus,
        reason: Option<&str>,
        acted_at: NaiveDateTime,
    ) -> Result<(), StoreError>;

    // reimbursements

    async fn insert_reimbursement(
        &mut self,
        owner_id: u64,
        claim: &NewReimbursement,
    ) -> Result<u64, StoreError>;
    async fn lock_reimbursement(&mut self, id: u64) -> Result<Option<Reimbursement>, StoreError>;
    async fn set_reimbursement_status(
        &mut self,
        id: u64,
        status: RequestStatus,
        rejection_reason: Option<&str>,
    ) -> Result<(), StoreError>;

    // attendance and calendar

    async fn attendance(&mut self, user_id: u64, date: NaiveDate)
    -> Result<Option<Attendance>, StoreError>;
    async fn attendance_on(&mut self, date: NaiveDate) -> Result<Vec<Attendance>, StoreError>;
    async fn upsert_attendance(&mut self, record: &Attendance) -> Result<(), StoreError>;
    async fn holidays_between(
        &mut self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Holiday>, StoreError>;
    async fn weekly_offs(&mut self, user_id: u64) -> Result<Vec<WeeklyOff>, StoreError>;

    // comp-off grants

    async fn insert_grant(&mut self, draft: &GrantDraft) -> Result<u64, StoreError>;
    async fn grant_exists(&mut self, user_id: u64, work_date: NaiveDate) -> Result<bool, StoreError>;
    async fn lock_grant(&mut self, id: u64) -> Result<Option<CompOffGrant>, StoreError>;
    async fn mark_grant_deleted(&mut self, id: u64) -> Result<(), StoreError>;
    async fn grants_of(&mut self, user_id: u64) -> Result<Vec<CompOffGrant>, StoreError>;

    // attendance corrections

    async fn insert_correction(
        &mut self,
        user_id: u64,
        correction: &NewCorrection,
    ) -> Result<u64, StoreError>;
    async fn lock_correction(&mut self, id: u64)
    -> Result<Option<AttendanceCorrection>, StoreError>;
    async fn save_correction(&mut self, correction: &AttendanceCorrection) -> Result<(), StoreError>;
}
