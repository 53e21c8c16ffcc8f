//! Leave and reimbursement approval workflow.
//!
//! Every public operation runs in one store transaction. The per-user
//! ledger row is locked before any decision that depends on a balance, and
//! a request row is locked before its approvals are aggregated, so two
//! approvers acting at once are serialized and only one of them can move
//! the request into a terminal state.

pub mod absence_sweep;
mod attendance_sync;
pub mod clock;
pub mod comp_off;
pub mod correction;
pub mod directory;
mod ledger;
pub mod notify;
pub mod quorum;
pub mod resolver;
pub mod submission;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::Config;
use crate::error::ServiceError;
use crate::model::calendar::WorkCalendar;
use crate::model::period::DateSpan;
use crate::model::role::Role;
use crate::model::user::User;
use crate::store::{Store, StoreError, StoreTx};

use self::clock::Clock;
use self::directory::DirectoryCache;
use self::notify::{Notification, Notifier};

/// Who is calling, as vouched for by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: u64,
    pub role: Role,
}

impl Actor {
    pub fn is_administrator(&self) -> bool {
        self.role.is_administrator()
    }

    /// Administrators may act for anyone; everyone else only for themselves.
    pub fn require_self_or_admin(&self, user_id: u64) -> Result<(), ServiceError> {
        if self.user_id == user_id || self.is_administrator() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("Admin/HR only"))
        }
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_administrator() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("Admin/HR only"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeavePolicy {
    pub monthly_leave_unit: f64,
    pub comp_off_full_day_hours: f64,
    pub comp_off_half_day_hours: f64,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            monthly_leave_unit: 1.0,
            comp_off_full_day_hours: 8.0,
            comp_off_half_day_hours: 4.0,
        }
    }
}

impl LeavePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            monthly_leave_unit: config.monthly_leave_unit,
            comp_off_full_day_hours: config.comp_off_full_day_hours,
            comp_off_half_day_hours: config.comp_off_half_day_hours,
        }
    }
}

pub struct Workflow<S> {
    store: S,
    directory: DirectoryCache,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    policy: LeavePolicy,
}

impl<S: Store> Workflow<S> {
    pub fn new(
        store: S,
        directory: DirectoryCache,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        policy: LeavePolicy,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
            clock,
            policy,
        }
    }

    pub fn directory(&self) -> &DirectoryCache {
        &self.directory
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    /// Fire-and-forget; a failing transport never undoes committed work.
    fn notify(&self, notification: Notification) {
        notify::dispatch(self.notifier.as_ref(), notification);
    }
}

/// Locks the user's row; inactive users are invisible.
async fn active_user<T: StoreTx>(tx: &mut T, user_id: u64) -> Result<User, ServiceError> {
    match tx.lock_user(user_id).await? {
        Some(user) if user.is_active => Ok(user),
        _ => Err(ServiceError::NotFound("user")),
    }
}

async fn work_calendar<T: StoreTx>(
    tx: &mut T,
    user_id: u64,
    span: &DateSpan,
) -> Result<WorkCalendar, StoreError> {
    let holidays = tx.holidays_between(span.start, span.end).await?;
    let offs = tx.weekly_offs(user_id).await?;
    Ok(WorkCalendar::new(holidays, offs))
}

fn display_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
