//! Nightly job turning unaccounted working days into unpaid leave.

use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::{Workflow, display_date, work_calendar};
use crate::error::ServiceError;
use crate::model::approval::RequestStatus;
use crate::model::attendance::{Attendance, AttendanceStatus};
use crate::model::leave_request::{LeaveDraft, LeaveType};
use crate::model::period::DateSpan;
use crate::store::{Store, StoreTx};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub users_processed: usize,
    pub created: usize,
    pub failed: usize,
}

pub fn absence_reason(date: NaiveDate) -> String {
    format!(
        "System generated: absent without leave or attendance on {}",
        display_date(date)
    )
}

/// Next time of day `at` strictly after `now`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Days::new(1)
    }
}

impl<S: Store> Workflow<S> {
    /// Creates one auto-approved unpaid leave per active staff member with
    /// nothing recorded on `date`. Users are settled independently.
    pub async fn run_daily_absence_sweep(&self, date: NaiveDate) -> Result<SweepReport, ServiceError> {
        let mut tx = self.store.begin().await?;
        let staff = tx.active_staff().await?;
        tx.commit().await?;

        let mut report = SweepReport {
            date,
            users_processed: 0,
            created: 0,
            failed: 0,
        };
        for user in &staff {
            report.users_processed += 1;
            match self.mark_absence(user.id, date).await {
                Ok(true) => report.created += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    warn!(user_id = user.id, %date, error = %e, "Absence sweep failed for user");
                }
            }
        }

        info!(
            %date,
            users_processed = report.users_processed,
            created = report.created,
            failed = report.failed,
            "Absence sweep finished"
        );
        Ok(report)
    }

    async fn mark_absence(&self, user_id: u64, date: NaiveDate) -> Result<bool, ServiceError> {
        let mut tx = self.store.begin().await?;
        match tx.lock_user(user_id).await? {
            Some(user) if user.is_active && !user.role.is_administrator() => {}
            _ => return Ok(false),
        }

        let day = DateSpan::single(date);
        if work_calendar(&mut tx, user_id, &day).await?.is_non_working(date) {
            return Ok(false);
        }
        if tx.attendance(user_id, date).await?.is_some() {
            return Ok(false);
        }
        let approved = tx.leaves_of(user_id, &[RequestStatus::Approved]).await?;
        if approved.iter().any(|l| l.span().contains(date)) {
            return Ok(false);
        }

        let draft = LeaveDraft {
            owner_id: user_id,
            leave_type: LeaveType::Unpaid,
            span: day,
            reason: Some(absence_reason(date)),
            status: RequestStatus::Approved,
            responsible_person_id: None,
            auto_absence_date: Some(date),
        };
        let Some(request_id) = tx.insert_auto_absence(&draft).await? else {
            return Ok(false);
        };
        tx.upsert_attendance(&Attendance {
            user_id,
            date,
            status: AttendanceStatus::Unpaid,
            check_in: None,
            check_out: None,
        })
        .await?;
        tx.commit().await?;

        info!(request_id, user_id, %date, "Unpaid absence recorded");
        Ok(true)
    }
}

/// Runs the sweep and comp-off detection for the previous day every day at `at`.
pub async fn run_absence_scheduler<S>(workflow: Arc<Workflow<S>>, at: NaiveTime)
where
    S: Store + 'static,
{
    info!(at = %at, "Absence scheduler started");
    loop {
        let now = workflow.clock().now();
        let next = next_run_after(now, at);
        let wait = (next - now).to_std().unwrap_or_default();
        actix_web::rt::time::sleep(wait).await;

        let Some(elapsed) = next.date().pred_opt() else {
            continue;
        };
        if let Err(e) = workflow.run_daily_absence_sweep(elapsed).await {
            error!(date = %elapsed, error = %e, "Absence sweep aborted");
        }
        if let Err(e) = workflow.detect_weekly_off_work(elapsed).await {
            error!(date = %elapsed, error = %e, "Comp-off detection aborted");
        }
    }
}
