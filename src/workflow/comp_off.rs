use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::notify::Notification;
use super::{Actor, LeavePolicy, Workflow, active_user, display_date, work_calendar};
use crate::error::ServiceError;
use crate::model::attendance::{Attendance, AttendanceStatus};
use crate::model::comp_off::{CompOffGrant, GrantDraft, GrantSource, GrantStatus, NewCompOffGrant};
use crate::model::period::DateSpan;
use crate::store::{Store, StoreTx};

const GRANT_DURATIONS: [f64; 2] = [0.5, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct CompOffReport {
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub examined: usize,
    pub granted: usize,
    pub failed: usize,
}

impl LeavePolicy {
    /// Comp-off earned for `hours` worked on a non-working day.
    pub(crate) fn comp_off_for_hours(&self, hours: f64) -> Option<f64> {
        if hours >= self.comp_off_full_day_hours {
            Some(1.0)
        } else if hours >= self.comp_off_half_day_hours {
            Some(0.5)
        } else {
            None
        }
    }
}

impl<S: Store> Workflow<S> {
    pub async fn grant_comp_off(
        &self,
        actor: &Actor,
        grant: NewCompOffGrant,
    ) -> Result<CompOffGrant, ServiceError> {
        actor.require_admin()?;
        if !GRANT_DURATIONS.contains(&grant.duration) {
            return Err(ServiceError::validation("duration must be 0.5 or 1.0"));
        }
        if grant.work_date > self.clock.today() {
            return Err(ServiceError::validation("work_date cannot be in the future"));
        }

        let mut tx = self.store.begin().await?;
        let user = active_user(&mut tx, grant.user_id).await?;
        if tx.grant_exists(user.id, grant.work_date).await? {
            return Err(ServiceError::validation(format!(
                "comp-off already granted for {}",
                display_date(grant.work_date)
            )));
        }

        let draft = GrantDraft {
            user_id: user.id,
            work_date: grant.work_date,
            duration: grant.duration,
            source: GrantSource::Manual,
            note: grant.note.filter(|n| !n.trim().is_empty()),
            granted_by: Some(actor.user_id),
        };
        let id = tx.insert_grant(&draft).await?;
        tx.adjust_comp_off_balance(user.id, draft.duration).await?;
        tx.commit().await?;

        info!(grant_id = id, user_id = user.id, duration = draft.duration, "Comp-off granted");
        self.notify(Notification {
            recipients: vec![user.id],
            subject: "Comp-off granted".to_string(),
            lines: vec![
                format!("Work date: {}", display_date(draft.work_date)),
                format!("Days: {}", draft.duration),
            ],
        });

        Ok(CompOffGrant {
            id,
            user_id: draft.user_id,
            work_date: draft.work_date,
            duration: draft.duration,
            status: GrantStatus::Active,
            source: draft.source,
            note: draft.note,
            granted_by: draft.granted_by,
        })
    }

    /// Deletes a grant and takes its units back.
    pub async fn delete_comp_off_grant(&self, actor: &Actor, grant_id: u64) -> Result<(), ServiceError> {
        actor.require_admin()?;

        let mut tx = self.store.begin().await?;
        let grant = match tx.lock_grant(grant_id).await? {
            Some(grant) if grant.status == GrantStatus::Active => grant,
            _ => return Err(ServiceError::NotFound("comp-off grant")),
        };
        let user = tx
            .lock_user(grant.user_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        if !tx.adjust_comp_off_balance(user.id, -grant.duration).await? {
            return Err(ServiceError::BalanceInsufficient {
                balance: "comp-off",
                requested: grant.duration,
                available: user.comp_off_balance,
            });
        }
        tx.mark_grant_deleted(grant.id).await?;
        tx.commit().await?;

        info!(grant_id, user_id = user.id, duration = grant.duration, "Comp-off grant reverted");
        Ok(())
    }

    pub async fn list_comp_off_grants(
        &self,
        actor: &Actor,
        user_id: u64,
    ) -> Result<Vec<CompOffGrant>, ServiceError> {
        actor.require_self_or_admin(user_id)?;
        let mut tx = self.store.begin().await?;
        let grants = tx.grants_of(user_id).await?;
        tx.commit().await?;
        Ok(grants)
    }

    /// Grants comp-off for work logged on holidays and weekly-offs of `date`.
    ///
    /// Each record is settled in its own transaction; a failure is logged
    /// and the run moves on.
    pub async fn detect_weekly_off_work(&self, date: NaiveDate) -> Result<CompOffReport, ServiceError> {
        let mut tx = self.store.begin().await?;
        let records = tx.attendance_on(date).await?;
        tx.commit().await?;

        let mut report = CompOffReport {
            date,
            examined: 0,
            granted: 0,
            failed: 0,
        };
        for record in records
            .iter()
            .filter(|r| r.status == AttendanceStatus::Present)
        {
            let Some(duration) = record
                .worked_hours()
                .and_then(|hours| self.policy.comp_off_for_hours(hours))
            else {
                continue;
            };
            report.examined += 1;
            match self.grant_for_off_day_work(record, duration).await {
                Ok(true) => report.granted += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    warn!(user_id = record.user_id, %date, error = %e, "Comp-off detection failed");
                }
            }
        }

        info!(
            %date,
            examined = report.examined,
            granted = report.granted,
            failed = report.failed,
            "Comp-off detection finished"
        );
        Ok(report)
    }

    async fn grant_for_off_day_work(
        &self,
        record: &Attendance,
        duration: f64,
    ) -> Result<bool, ServiceError> {
        let mut tx = self.store.begin().await?;
        let user = match tx.lock_user(record.user_id).await? {
            Some(user) if user.is_active => user,
            _ => return Ok(false),
        };
        let calendar = work_calendar(&mut tx, user.id, &DateSpan::single(record.date)).await?;
        if !calendar.is_non_working(record.date) || tx.grant_exists(user.id, record.date).await? {
            return Ok(false);
        }

        tx.insert_grant(&GrantDraft {
            user_id: user.id,
            work_date: record.date,
            duration,
            source: GrantSource::Automatic,
            note: Some("Worked on a non-working day".to_string()),
            granted_by: None,
        })
        .await?;
        tx.adjust_comp_off_balance(user.id, duration).await?;
        tx.commit().await?;

        info!(user_id = user.id, date = %record.date, duration, "Automatic comp-off granted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_map_to_comp_off_units() {
        let policy = LeavePolicy::default();
        assert_eq!(policy.comp_off_for_hours(9.0), Some(1.0));
        assert_eq!(policy.comp_off_for_hours(8.0), Some(1.0));
        assert_eq!(policy.comp_off_for_hours(5.5), Some(0.5));
        assert_eq!(policy.comp_off_for_hours(3.9), None);
    }
}
