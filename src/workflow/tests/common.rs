use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::model::approval::{Decision, RequestKind, RequestStatus};
use crate::model::leave_request::{LeaveType, NewLeave};
use crate::model::role::Role;
use crate::store::memory::{MemoryState, MemoryStore};
use crate::workflow::clock::FixedClock;
use crate::workflow::directory::DirectoryCache;
use crate::workflow::notify::Notifier;
use crate::workflow::notify::testing::RecordingNotifier;
use crate::workflow::{Actor, LeavePolicy, Workflow};

pub(super) const ADMIN: u64 = 1;
pub(super) const MANAGER_A: u64 = 10;
pub(super) const MANAGER_B: u64 = 11;
pub(super) const EMPLOYEE: u64 = 20;
pub(super) const COLLEAGUE: u64 = 21;
pub(super) const DEPARTMENT: u64 = 100;

/// 2025-04-09 is a Wednesday.
pub(super) fn today() -> NaiveDate {
    d(4, 9)
}

pub(super) fn d(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).expect("valid date")
}

pub(super) fn admin() -> Actor {
    Actor {
        user_id: ADMIN,
        role: Role::Admin,
    }
}

pub(super) fn staff(user_id: u64) -> Actor {
    Actor {
        user_id,
        role: Role::Employee,
    }
}

/// One department managed by two managers, with every ledger already
/// credited for April so accrual stays out of the way.
pub(super) fn office(leave_balance: f64) -> MemoryState {
    MemoryState::default()
        .with_user(ADMIN, Role::Admin, 0.0, 0.0)
        .with_user(MANAGER_A, Role::Employee, 10.0, 0.0)
        .with_user(MANAGER_B, Role::Employee, 10.0, 0.0)
        .with_user(EMPLOYEE, Role::Employee, leave_balance, 0.0)
        .with_user(COLLEAGUE, Role::Employee, 10.0, 0.0)
        .with_credit_marker(ADMIN, "2025-04")
        .with_credit_marker(MANAGER_A, "2025-04")
        .with_credit_marker(MANAGER_B, "2025-04")
        .with_credit_marker(EMPLOYEE, "2025-04")
        .with_credit_marker(COLLEAGUE, "2025-04")
        .with_department(DEPARTMENT, &[MANAGER_A, MANAGER_B], &[EMPLOYEE, COLLEAGUE])
}

pub(super) struct Harness {
    pub workflow: Workflow<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(state: MemoryState) -> Self {
        Self::on(state, today())
    }

    pub fn on(state: MemoryState, date: NaiveDate) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let workflow = workflow_with(state, date, notifier.clone());
        Self { workflow, notifier }
    }

    pub async fn state(&self) -> MemoryState {
        self.workflow.store().snapshot().await
    }

    pub async fn submit(&self, owner: u64, leave: NewLeave) -> u64 {
        self.workflow
            .submit_leave(&staff(owner), leave)
            .await
            .expect("submission accepted")
            .request_id
    }

    pub async fn vote(&self, actor: &Actor, request_id: u64, decision: Decision) -> RequestStatus {
        self.workflow
            .act_on_request(actor, RequestKind::Leave, request_id, decision, None)
            .await
            .expect("vote accepted")
    }
}

pub(super) fn workflow_with(
    state: MemoryState,
    date: NaiveDate,
    notifier: Arc<dyn Notifier>,
) -> Workflow<MemoryStore> {
    Workflow::new(
        MemoryStore::new(state),
        DirectoryCache::new(Duration::from_secs(300)),
        notifier,
        Arc::new(FixedClock::on(date)),
        LeavePolicy::default(),
    )
}

pub(super) fn leave(leave_type: LeaveType, start: NaiveDate, end: NaiveDate) -> NewLeave {
    NewLeave {
        leave_type,
        start_date: start,
        end_date: end,
        reason: Some("Family trip".to_string()),
        responsible_person_id: None,
    }
}
