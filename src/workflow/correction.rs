use tracing::info;

use super::ledger::credit_back;
use super::notify::Notification;
use super::{Actor, Workflow, active_user, display_date};
use crate::error::ServiceError;
use crate::model::approval::{Decision, RequestStatus};
use crate::model::attendance::{Attendance, AttendanceStatus};
use crate::model::correction::{AttendanceCorrection, NewCorrection};
use crate::model::leave_request::Charge;
use crate::store::{Store, StoreTx};

pub const CORRECTED_LEAVE_REASON: &str = "Attendance corrected to present";

fn needs_correction(existing: Option<&Attendance>) -> bool {
    existing.is_none_or(|a| matches!(a.status, AttendanceStatus::Absent | AttendanceStatus::Unpaid))
}

impl<S: Store> Workflow<S> {
    /// Files a claim that the caller was present on a day recorded as absent.
    pub async fn request_correction(
        &self,
        actor: &Actor,
        correction: NewCorrection,
    ) -> Result<AttendanceCorrection, ServiceError> {
        let reason = correction.reason.trim().to_string();
        if reason.is_empty() {
            return Err(ServiceError::validation("reason is required"));
        }
        if correction.check_out <= correction.check_in {
            return Err(ServiceError::validation("check_out must be after check_in"));
        }
        if correction.date > self.clock.today() {
            return Err(ServiceError::validation("date cannot be in the future"));
        }
        if correction.witness_id == actor.user_id {
            return Err(ServiceError::validation("you cannot be your own witness"));
        }

        let mut tx = self.store.begin().await?;
        let user = active_user(&mut tx, actor.user_id).await?;
        match tx.lock_user(correction.witness_id).await? {
            Some(witness) if witness.is_active => {}
            _ => return Err(ServiceError::validation("witness must be an active user")),
        }
        let existing = tx.attendance(user.id, correction.date).await?;
        if !needs_correction(existing.as_ref()) {
            return Err(ServiceError::validation(format!(
                "attendance on {} does not need a correction",
                display_date(correction.date)
            )));
        }

        let id = tx.insert_correction(user.id, &correction).await?;
        tx.commit().await?;

        info!(correction_id = id, user_id = user.id, date = %correction.date, "Attendance correction requested");
        Ok(AttendanceCorrection {
            id,
            user_id: user.id,
            date: correction.date,
            check_in: correction.check_in,
            check_out: correction.check_out,
            witness_id: correction.witness_id,
            reason,
            status: RequestStatus::Pending,
            decided_by: None,
            decision_reason: None,
        })
    }

    /// Administrator decision on a correction. Approval marks the day
    /// present and rejects a single-day leave filed for it.
    pub async fn decide_correction(
        &self,
        actor: &Actor,
        correction_id: u64,
        decision: Decision,
        reason: Option<String>,
    ) -> Result<AttendanceCorrection, ServiceError> {
        actor.require_admin()?;

        let mut tx = self.store.begin().await?;
        let mut correction = tx
            .lock_correction(correction_id)
            .await?
            .ok_or(ServiceError::NotFound("attendance correction"))?;
        if correction.user_id == actor.user_id {
            return Err(ServiceError::SelfApprovalForbidden);
        }
        if correction.status.is_terminal() {
            return Err(ServiceError::validation("correction has already been decided"));
        }
        let user = active_user(&mut tx, correction.user_id).await?;

        if decision == Decision::Approve {
            tx.upsert_attendance(&Attendance {
                user_id: user.id,
                date: correction.date,
                status: AttendanceStatus::Present,
                check_in: Some(correction.check_in),
                check_out: Some(correction.check_out),
            })
            .await?;

            let leaves = tx
                .leaves_of(user.id, &[RequestStatus::Pending, RequestStatus::Approved])
                .await?;
            for mut leave in leaves
                .into_iter()
                .filter(|l| l.start_date == correction.date && l.end_date == correction.date)
            {
                if leave.status == RequestStatus::Approved && leave.leave_type.is_chargeable() {
                    credit_back(&mut tx, user.id, Charge::Leave(leave.day_count())).await?;
                }
                leave.status = RequestStatus::Rejected;
                leave.rejection_reason = Some(CORRECTED_LEAVE_REASON.to_string());
                tx.save_leave(&leave).await?;
                info!(request_id = leave.id, "Leave rejected by attendance correction");
            }
        }

        correction.status = decision.as_status();
        correction.decided_by = Some(actor.user_id);
        correction.decision_reason = reason.filter(|r| !r.trim().is_empty());
        tx.save_correction(&correction).await?;
        tx.commit().await?;

        info!(correction_id, status = %correction.status, "Attendance correction decided");
        self.notify(Notification {
            recipients: vec![correction.user_id],
            subject: format!("Attendance correction {}", correction.status),
            lines: vec![format!("Date: {}", display_date(correction.date))],
        });
        Ok(correction)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 9).expect("valid date")
    }

    fn record(status: AttendanceStatus) -> Attendance {
        Attendance {
            user_id: 1,
            date: day(),
            status,
            check_in: None,
            check_out: None,
        }
    }

    #[test]
    fn only_absent_days_can_be_corrected() {
        assert!(needs_correction(None));
        assert!(needs_correction(Some(&record(AttendanceStatus::Absent))));
        assert!(needs_correction(Some(&record(AttendanceStatus::Unpaid))));
        assert!(!needs_correction(Some(&record(AttendanceStatus::Present))));
        assert!(!needs_correction(Some(&record(AttendanceStatus::Leave))));
    }
}
