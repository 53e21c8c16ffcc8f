use chrono::Weekday;

use super::common::*;
use crate::model::approval::{Decision, RequestStatus};
use crate::model::attendance::{Attendance, AttendanceStatus};
use crate::model::calendar::WeeklyOff;
use crate::model::leave_request::LeaveType;
use crate::model::role::Role;
use crate::store::memory::MemoryState;
use crate::workflow::absence_sweep::absence_reason;

fn solo(leave_balance: f64) -> MemoryState {
    MemoryState::default().with_user(EMPLOYEE, Role::Employee, leave_balance, 0.0)
}

#[actix_web::test]
async fn weekly_off_day_creates_nothing() {
    // 2025-04-08 is a Tuesday.
    let harness = Harness::new(solo(4.0).with_weekly_off(EMPLOYEE, WeeklyOff::Fixed(Weekday::Tue)));

    let report = harness
        .workflow
        .run_daily_absence_sweep(d(4, 8))
        .await
        .expect("sweep");

    assert_eq!(report.users_processed, 1);
    assert_eq!(report.created, 0);
    assert!(harness.state().await.leaves.is_empty());
}

#[actix_web::test]
async fn unaccounted_day_becomes_one_approved_unpaid_leave() {
    let harness = Harness::new(solo(4.0));

    let report = harness
        .workflow
        .run_daily_absence_sweep(d(4, 8))
        .await
        .expect("sweep");

    assert_eq!(report.created, 1);
    let state = harness.state().await;
    let leaves = state.leaves_owned_by(EMPLOYEE);
    assert_eq!(leaves.len(), 1);
    let absence = leaves[0];
    assert_eq!(absence.leave_type, LeaveType::Unpaid);
    assert_eq!(absence.status, RequestStatus::Approved);
    assert_eq!((absence.start_date, absence.end_date), (d(4, 8), d(4, 8)));
    assert_eq!(absence.reason.as_deref(), Some(absence_reason(d(4, 8)).as_str()));
    assert_eq!(absence.auto_absence_date, Some(d(4, 8)));
    assert!(state.approvals.is_empty());
    assert_eq!(state.user(EMPLOYEE).leave_balance, 4.0);
    assert_eq!(
        state.attendance[&(EMPLOYEE, d(4, 8))].status,
        AttendanceStatus::Unpaid
    );
}

#[actix_web::test]
async fn rerunning_the_sweep_creates_nothing_new() {
    let harness = Harness::new(solo(4.0));

    harness.workflow.run_daily_absence_sweep(d(4, 8)).await.expect("sweep");
    let second = harness
        .workflow
        .run_daily_absence_sweep(d(4, 8))
        .await
        .expect("sweep");

    assert_eq!(second.created, 0);
    assert_eq!(harness.state().await.leaves_owned_by(EMPLOYEE).len(), 1);
}

#[actix_web::test]
async fn storage_uniqueness_stops_a_duplicate_absence() {
    let harness = Harness::new(solo(4.0));
    harness.workflow.run_daily_absence_sweep(d(4, 8)).await.expect("sweep");
    // A racing run that missed the attendance row still cannot double-create.
    harness
        .workflow
        .store()
        .update(|state| {
            state.attendance.clear();
        })
        .await;

    let second = harness
        .workflow
        .run_daily_absence_sweep(d(4, 8))
        .await
        .expect("sweep");

    assert_eq!(second.created, 0);
    assert_eq!(second.failed, 0);
}

#[actix_web::test]
async fn accounted_days_are_skipped() {
    let state = office(5.0)
        .with_holiday(d(4, 2), "Founders day")
        .with_attendance(Attendance {
            user_id: COLLEAGUE,
            date: d(4, 8),
            status: AttendanceStatus::Present,
            check_in: None,
            check_out: None,
        });
    let harness = Harness::new(state);
    let approved = harness
        .submit(EMPLOYEE, leave(LeaveType::Paid, d(4, 7), d(4, 8)))
        .await;
    harness.vote(&admin(), approved, Decision::Approve).await;

    let holiday = harness
        .workflow
        .run_daily_absence_sweep(d(4, 2))
        .await
        .expect("sweep");
    assert_eq!(holiday.created, 0);

    let report = harness
        .workflow
        .run_daily_absence_sweep(d(4, 8))
        .await
        .expect("sweep");

    // Only the two managers had nothing recorded; the admin is never swept.
    assert_eq!(report.users_processed, 4);
    assert_eq!(report.created, 2);
    let state = harness.state().await;
    assert_eq!(state.leaves_owned_by(EMPLOYEE).len(), 1);
    assert!(state.leaves_owned_by(COLLEAGUE).is_empty());
    assert!(state.leaves_owned_by(ADMIN).is_empty());
    assert_eq!(state.leaves_owned_by(MANAGER_A).len(), 1);
}

#[actix_web::test]
async fn pending_leave_does_not_shield_the_day() {
    let harness = Harness::new(office(5.0));
    let pending = harness
        .submit(EMPLOYEE, leave(LeaveType::Paid, d(4, 8), d(4, 8)))
        .await;

    harness.workflow.run_daily_absence_sweep(d(4, 8)).await.expect("sweep");

    let state = harness.state().await;
    let unpaid = state
        .leaves_owned_by(EMPLOYEE)
        .into_iter()
        .filter(|l| l.leave_type == LeaveType::Unpaid)
        .count();
    assert_eq!(unpaid, 1);

    // Once the managers agree, the late request loses to the recorded absence.
    harness.vote(&staff(MANAGER_A), pending, Decision::Approve).await;
    let status = harness.vote(&staff(MANAGER_B), pending, Decision::Approve).await;
    assert_eq!(status, RequestStatus::Rejected);
    assert_eq!(harness.state().await.user(EMPLOYEE).leave_balance, 5.0);
}

#[actix_web::test]
async fn one_broken_user_does_not_stop_the_batch() {
    let state = solo(4.0)
        .with_user(COLLEAGUE, Role::Employee, 4.0, 0.0)
        .with_broken_calendar(EMPLOYEE);
    let harness = Harness::new(state);

    let report = harness
        .workflow
        .run_daily_absence_sweep(d(4, 8))
        .await
        .expect("sweep");

    assert_eq!(report.users_processed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.created, 1);
    let state = harness.state().await;
    assert!(state.leaves_owned_by(EMPLOYEE).is_empty());
    assert_eq!(state.leaves_owned_by(COLLEAGUE).len(), 1);
}

#[actix_web::test]
async fn service_accounts_are_swept_but_administrators_are_not() {
    const SERVICE: u64 = 30;
    let state = solo(4.0)
        .with_user(SERVICE, Role::System, 0.0, 0.0)
        .with_user(ADMIN, Role::Admin, 0.0, 0.0);
    let harness = Harness::new(state);

    let report = harness
        .workflow
        .run_daily_absence_sweep(d(4, 8))
        .await
        .expect("sweep");

    assert_eq!(report.users_processed, 2);
    assert_eq!(report.created, 2);
    let state = harness.state().await;
    assert_eq!(state.leaves_owned_by(SERVICE).len(), 1);
    assert!(state.leaves_owned_by(ADMIN).is_empty());
}
