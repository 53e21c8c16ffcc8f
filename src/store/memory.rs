//! In-process store used by the workflow tests.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use futures::lock::{Mutex, MutexGuard};

use super::{CreditMode, LeaveQuery, Store, StoreError, StoreTx};
use crate::model::approval::{ApprovalRecord, ApproverRole, RequestKind, RequestStatus};
use crate::model::attendance::Attendance;
use crate::model::calendar::{Holiday, WeeklyOff};
use crate::model::comp_off::{CompOffGrant, GrantDraft, GrantStatus};
use crate::model::correction::{AttendanceCorrection, NewCorrection};
use crate::model::leave_request::{LeaveDraft, LeaveRequest};
use crate::model::period::YearMonth;
use crate::model::reimbursement::{NewReimbursement, Reimbursement};
use crate::model::role::Role;
use crate::model::user::User;

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub users: BTreeMap<u64, User>,
    /// (department, user)
    pub members: Vec<(u64, u64)>,
    /// (department, user)
    pub managers: Vec<(u64, u64)>,
    pub holidays: Vec<Holiday>,
    pub weekly_offs: Vec<(u64, WeeklyOff)>,
    pub leaves: BTreeMap<u64, LeaveRequest>,
    pub approvals: Vec<ApprovalRecord>,
    pub reimbursements: BTreeMap<u64, Reimbursement>,
    pub attendance: BTreeMap<(u64, NaiveDate), Attendance>,
    pub grants: BTreeMap<u64, CompOffGrant>,
    pub corrections: BTreeMap<u64, AttendanceCorrection>,
    pub next_id: u64,
    /// Operations that fail with a database error, for rollback tests.
    pub fail_on: HashSet<&'static str>,
    /// Users whose calendar reads fail, for per-user isolation tests.
    pub broken_calendars: HashSet<u64>,
    pub manager_lookups: usize,
}

impl MemoryState {
    pub fn with_user(mut self, id: u64, role: Role, leave_balance: f64, comp_off_balance: f64) -> Self {
        self.users.insert(
            id,
            User {
                id,
                username: format!("user{id}"),
                role,
                is_active: true,
                leave_balance,
                comp_off_balance,
                last_leave_credit_period: None,
            },
        );
        self
    }

    pub fn with_credit_marker(mut self, user_id: u64, marker: &str) -> Self {
        if let Some(user) = self.users.get_mut(&user_id) {
            user.last_leave_credit_period = Some(marker.parse().expect("valid marker"));
        }
        self
    }

    pub fn with_department(mut self, id: u64, managers: &[u64], members: &[u64]) -> Self {
        self.managers.extend(managers.iter().map(|m| (id, *m)));
        self.members.extend(members.iter().map(|m| (id, *m)));
        self
    }

    pub fn with_holiday(mut self, date: NaiveDate, title: &str) -> Self {
        self.holidays.push(Holiday {
            date,
            title: title.to_string(),
        });
        self
    }

    pub fn with_weekly_off(mut self, user_id: u64, off: WeeklyOff) -> Self {
        self.weekly_offs.push((user_id, off));
        self
    }

    pub fn with_attendance(mut self, record: Attendance) -> Self {
        self.attendance.insert((record.user_id, record.date), record);
        self
    }

    pub fn failing_on(mut self, op: &'static str) -> Self {
        self.fail_on.insert(op);
        self
    }

    pub fn with_broken_calendar(mut self, user_id: u64) -> Self {
        self.broken_calendars.insert(user_id);
        self
    }

    pub fn user(&self, id: u64) -> &User {
        self.users.get(&id).expect("seeded user")
    }

    pub fn leaves_owned_by(&self, owner_id: u64) -> Vec<&LeaveRequest> {
        self.leaves.values().filter(|l| l.owner_id == owner_id).collect()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, op: &'static str) -> Result<(), StoreError> {
        if self.fail_on.contains(op) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

fn created_at(id: u64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid timestamp")
        + Duration::seconds(id as i64)
}

pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new(state: MemoryState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    pub async fn update(&self, f: impl FnOnce(&mut MemoryState)) {
        f(&mut *self.state.lock().await);
    }
}

impl Store for MemoryStore {
    type Tx<'a>
        = MemoryTx<'a>
    where
        Self: 'a;

    async fn begin(&self) -> Result<Self::Tx<'_>, StoreError> {
        let guard = self.state.lock().await;
        let work = guard.clone();
        Ok(MemoryTx { guard, work })
    }
}

/// Works on a copy; `commit` swaps it in, dropping discards it.
pub struct MemoryTx<'a> {
    guard: MutexGuard<'a, MemoryState>,
    work: MemoryState,
}

impl StoreTx for MemoryTx<'_> {
    async fn commit(mut self) -> Result<(), StoreError> {
        self.work.check("commit")?;
        *self.guard = self.work;
        Ok(())
    }

    async fn lock_user(&mut self, user_id: u64) -> Result<Option<User>, StoreError> {
        self.work.check("lock_user")?;
        Ok(self.work.users.get(&user_id).cloned())
    }

    async fn user(&mut self, user_id: u64) -> Result<Option<User>, StoreError> {
        self.work.check("user")?;
        Ok(self.work.users.get(&user_id).cloned())
    }

    async fn active_staff(&mut self) -> Result<Vec<User>, StoreError> {
        self.work.check("active_staff")?;
        Ok(self
            .work
            .users
            .values()
            .filter(|u| u.is_active && !u.role.is_administrator())
            .cloned()
            .collect())
    }

    async fn apply_leave_credit(
        &mut self,
        user_id: u64,
        expected: Option<YearMonth>,
        next: YearMonth,
        mode: CreditMode,
    ) -> Result<bool, StoreError> {
        self.work.check("apply_leave_credit")?;
        let Some(user) = self.work.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if user.last_leave_credit_period != expected {
            return Ok(false);
        }
        match mode {
            CreditMode::Add(amount) => user.leave_balance += amount,
            CreditMode::Reset(amount) => user.leave_balance = amount,
        }
        user.last_leave_credit_period = Some(next);
        Ok(true)
    }

    async fn adjust_leave_balance(&mut self, user_id: u64, delta: f64) -> Result<bool, StoreError> {
        self.work.check("adjust_leave_balance")?;
        match self.work.users.get_mut(&user_id) {
            Some(user) if user.leave_balance + delta >= 0.0 => {
                user.leave_balance += delta;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn adjust_comp_off_balance(
        &mut self,
        user_id: u64,
        delta: f64,
    ) -> Result<bool, StoreError> {
        self.work.check("adjust_comp_off_balance")?;
        match self.work.users.get_mut(&user_id) {
            Some(user) if user.comp_off_balance + delta >= 0.0 => {
                user.comp_off_balance += delta;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn departments_of(&mut self, user_id: u64) -> Result<Vec<u64>, StoreError> {
        let mut ids: Vec<u64> = self
            .work
            .members
            .iter()
            .filter(|(_, member)| *member == user_id)
            .map(|(department, _)| *department)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn department_managers(&mut self, department_id: u64) -> Result<Vec<u64>, StoreError> {
        self.work.manager_lookups += 1;
        let users = &self.work.users;
        let mut ids: Vec<u64> = self
            .work
            .managers
            .iter()
            .filter(|(department, _)| *department == department_id)
            .map(|(_, manager)| *manager)
            .filter(|manager| users.get(manager).is_some_and(|u| u.is_active))
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn managed_departments(&mut self, user_id: u64) -> Result<Vec<u64>, StoreError> {
        Ok(self
            .work
            .managers
            .iter()
            .filter(|(_, manager)| *manager == user_id)
            .map(|(department, _)| *department)
            .collect())
    }

    async fn insert_leave(&mut self, draft: &LeaveDraft) -> Result<u64, StoreError> {
        self.work.check("insert_leave")?;
        let id = self.work.next_id();
        self.work.leaves.insert(
            id,
            LeaveRequest {
                id,
                owner_id: draft.owner_id,
                leave_type: draft.leave_type,
                start_date: draft.span.start,
                end_date: draft.span.end,
                reason: draft.reason.clone(),
                status: draft.status,
                rejection_reason: None,
                admin_deleted: false,
                employee_deleted: false,
                responsible_person_id: draft.responsible_person_id,
                auto_absence_date: draft.auto_absence_date,
                created_at: created_at(id),
            },
        );
        Ok(id)
    }

    async fn insert_auto_absence(&mut self, draft: &LeaveDraft) -> Result<Option<u64>, StoreError> {
        let duplicate = self.work.leaves.values().any(|l| {
            l.owner_id == draft.owner_id
                && l.auto_absence_date.is_some()
                && l.auto_absence_date == draft.auto_absence_date
        });
        if duplicate {
            return Ok(None);
        }
        self.insert_leave(draft).await.map(Some)
    }

    async fn lock_leave(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.work.leaves.get(&id).cloned())
    }

    async fn save_leave(&mut self, leave: &LeaveRequest) -> Result<(), StoreError> {
        self.work.check("save_leave")?;
        self.work.leaves.insert(leave.id, leave.clone());
        Ok(())
    }

    async fn leaves_of(
        &mut self,
        owner_id: u64,
        statuses: &[RequestStatus],
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        let mut leaves: Vec<LeaveRequest> = self
            .work
            .leaves
            .values()
            .filter(|l| l.owner_id == owner_id && !l.is_deleted() && statuses.contains(&l.status))
            .cloned()
            .collect();
        leaves.sort_by_key(|l| l.start_date);
        Ok(leaves)
    }

    async fn list_leaves(
        &mut self,
        query: &LeaveQuery,
    ) -> Result<(Vec<LeaveRequest>, i64), StoreError> {
        let mut matching: Vec<LeaveRequest> = self
            .work
            .leaves
            .values()
            .filter(|l| !l.admin_deleted)
            .filter(|l| !(query.hide_employee_deleted && l.employee_deleted))
            .filter(|l| query.owner_id.is_none_or(|owner| l.owner_id == owner))
            .filter(|l| query.status.is_none_or(|status| l.status == status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn insert_approval(&mut self, record: &ApprovalRecord) -> Result<(), StoreError> {
        self.work.check("insert_approval")?;
        self.work.approvals.push(record.clone());
        Ok(())
    }

    async fn approvals(
        &mut self,
        kind: RequestKind,
        request_id: u64,
    ) -> Result<Vec<ApprovalRecord>, StoreError> {
        let mut records: Vec<ApprovalRecord> = self
            .work
            .approvals
            .iter()
            .filter(|r| r.request_kind == kind && r.request_id == request_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.approver_id);
        Ok(records)
    }

    async fn upsert_vote(
        &mut self,
        kind: RequestKind,
        request_id: u64,
        approver_id: u64,
        role: ApproverRole,
        status: RequestStatus,
        reason: Option<&str>,
        acted_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        self.work.check("upsert_vote")?;
        let existing = self.work.approvals.iter_mut().find(|r| {
            r.request_kind == kind
                && r.request_id == request_id
                && r.approver_id == approver_id
                && r.approver_role == role
        });
        match existing {
            Some(record) => {
                record.status = status;
                record.reason = reason.map(str::to_string);
                record.acted_at = Some(acted_at);
            }
            None => self.work.approvals.push(ApprovalRecord {
                request_kind: kind,
                request_id,
                approver_id,
                approver_role: role,
                status,
                acted_at: Some(acted_at),
                reason: reason.map(str::to_string),
            }),
        }
        Ok(())
    }

    async fn insert_reimbursement(
        &mut self,
        owner_id: u64,
        claim: &NewReimbursement,
    ) -> Result<u64, StoreError> {
        let id = self.work.next_id();
        self.work.reimbursements.insert(
            id,
            Reimbursement {
                id,
                owner_id,
                amount: claim.amount,
                category: claim.category.trim().to_string(),
                description: claim.description.trim().to_string(),
                expense_date: claim.expense_date,
                status: RequestStatus::Pending,
                rejection_reason: None,
                created_at: created_at(id),
            },
        );
        Ok(id)
    }

    async fn lock_reimbursement(&mut self, id: u64) -> Result<Option<Reimbursement>, StoreError> {
        Ok(self.work.reimbursements.get(&id).cloned())
    }

    async fn set_reimbursement_status(
        &mut self,
        id: u64,
        status: RequestStatus,
        rejection_reason: Option<&str>,
    ) -> Result<(), StoreError> {
        if let Some(claim) = self.work.reimbursements.get_mut(&id) {
            claim.status = status;
            claim.rejection_reason = rejection_reason.map(str::to_string);
        }
        Ok(())
    }

    async fn attendance(
        &mut self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<Attendance>, StoreError> {
        Ok(self.work.attendance.get(&(user_id, date)).cloned())
    }

    async fn attendance_on(&mut self, date: NaiveDate) -> Result<Vec<Attendance>, StoreError> {
        Ok(self
            .work
            .attendance
            .values()
            .filter(|a| a.date == date)
            .cloned()
            .collect())
    }

    async fn upsert_attendance(&mut self, record: &Attendance) -> Result<(), StoreError> {
        self.work.check("upsert_attendance")?;
        self.work
            .attendance
            .insert((record.user_id, record.date), record.clone());
        Ok(())
    }

    async fn holidays_between(
        &mut self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Holiday>, StoreError> {
        Ok(self
            .work
            .holidays
            .iter()
            .filter(|h| from <= h.date && h.date <= to)
            .cloned()
            .collect())
    }

    async fn weekly_offs(&mut self, user_id: u64) -> Result<Vec<WeeklyOff>, StoreError> {
        self.work.check("weekly_offs")?;
        if self.work.broken_calendars.contains(&user_id) {
            return Err(StoreError::Corrupt(format!("weekly_offs for user {user_id}")));
        }
        Ok(self
            .work
            .weekly_offs
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, off)| *off)
            .collect())
    }

    async fn insert_grant(&mut self, draft: &GrantDraft) -> Result<u64, StoreError> {
        let id = self.work.next_id();
        self.work.grants.insert(
            id,
            CompOffGrant {
                id,
                user_id: draft.user_id,
                work_date: draft.work_date,
                duration: draft.duration,
                status: GrantStatus::Active,
                source: draft.source,
                note: draft.note.clone(),
                granted_by: draft.granted_by,
            },
        );
        Ok(id)
    }

    async fn grant_exists(&mut self, user_id: u64, work_date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self.work.grants.values().any(|g| {
            g.user_id == user_id && g.work_date == work_date && g.status == GrantStatus::Active
        }))
    }

    async fn lock_grant(&mut self, id: u64) -> Result<Option<CompOffGrant>, StoreError> {
        Ok(self.work.grants.get(&id).cloned())
    }

    async fn mark_grant_deleted(&mut self, id: u64) -> Result<(), StoreError> {
        if let Some(grant) = self.work.grants.get_mut(&id) {
            grant.status = GrantStatus::Deleted;
        }
        Ok(())
    }

    async fn grants_of(&mut self, user_id: u64) -> Result<Vec<CompOffGrant>, StoreError> {
        let mut grants: Vec<CompOffGrant> = self
            .work
            .grants
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        grants.sort_by(|a, b| b.work_date.cmp(&a.work_date));
        Ok(grants)
    }

    async fn insert_correction(
        &mut self,
        user_id: u64,
        correction: &NewCorrection,
    ) -> Result<u64, StoreError> {
        let id = self.work.next_id();
        self.work.corrections.insert(
            id,
            AttendanceCorrection {
                id,
                user_id,
                date: correction.date,
                check_in: correction.check_in,
                check_out: correction.check_out,
                witness_id: correction.witness_id,
                reason: correction.reason.trim().to_string(),
                status: RequestStatus::Pending,
                decided_by: None,
                decision_reason: None,
            },
        );
        Ok(id)
    }

    async fn lock_correction(
        &mut self,
        id: u64,
    ) -> Result<Option<AttendanceCorrection>, StoreError> {
        Ok(self.work.corrections.get(&id).cloned())
    }

    async fn save_correction(&mut self, correction: &AttendanceCorrection) -> Result<(), StoreError> {
        self.work.corrections.insert(correction.id, correction.clone());
        Ok(())
    }
}
