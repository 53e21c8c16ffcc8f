use chrono::NaiveDate;
use tracing::{debug, info};

use super::{Actor, Workflow, active_user};
use crate::error::ServiceError;
use crate::model::leave_request::Charge;
use crate::model::period::YearMonth;
use crate::model::user::{Balances, User};
use crate::store::{CreditMode, Store, StoreTx};

/// What an accrual run owes the user in `current`, if anything.
///
/// A year change throws away the unused balance and starts over with one
/// month's unit; within a year every whole elapsed month earns one unit.
pub(crate) fn credit_due(
    marker: Option<YearMonth>,
    current: YearMonth,
    monthly_unit: f64,
) -> Option<CreditMode> {
    match marker {
        None => Some(CreditMode::Add(monthly_unit)),
        Some(last) if last.year < current.year => Some(CreditMode::Reset(monthly_unit)),
        Some(last) if last.year == current.year && current.month > last.month => Some(
            CreditMode::Add(f64::from(current.month - last.month) * monthly_unit),
        ),
        Some(_) => None,
    }
}

/// Runs the monthly accrual for `user` and refreshes it in place.
///
/// The write is conditional on the marker the caller read, so a second
/// run in the same month, concurrent or not, credits nothing.
pub(crate) async fn credit_monthly_leave_if_needed<T: StoreTx>(
    tx: &mut T,
    user: &mut User,
    today: NaiveDate,
    monthly_unit: f64,
) -> Result<f64, ServiceError> {
    let current = YearMonth::of(today);
    let Some(mode) = credit_due(user.last_leave_credit_period, current, monthly_unit) else {
        return Ok(0.0);
    };

    let applied = tx
        .apply_leave_credit(user.id, user.last_leave_credit_period, current, mode)
        .await?;
    if !applied {
        debug!(user_id = user.id, "Leave credit already applied for {}", current);
        if let Some(fresh) = tx.lock_user(user.id).await? {
            *user = fresh;
        }
        return Ok(0.0);
    }

    let credited = match mode {
        CreditMode::Add(amount) => {
            user.leave_balance += amount;
            amount
        }
        CreditMode::Reset(amount) => {
            user.leave_balance = amount;
            amount
        }
    };
    user.last_leave_credit_period = Some(current);
    debug!(user_id = user.id, credited, period = %current, "Monthly leave credited");
    Ok(credited)
}

/// Rejects a charge the user cannot cover right now.
pub(crate) fn ensure_covered(user: &User, charge: Charge) -> Result<(), ServiceError> {
    match charge {
        Charge::Leave(days) if days > user.leave_balance => Err(ServiceError::BalanceInsufficient {
            balance: "leave",
            requested: days,
            available: user.leave_balance,
        }),
        Charge::CompOff(days) if days > user.comp_off_balance => {
            Err(ServiceError::BalanceInsufficient {
                balance: "comp-off",
                requested: days,
                available: user.comp_off_balance,
            })
        }
        _ => Ok(()),
    }
}

/// Draws `charge` from the matching balance with a conditional decrement.
pub(crate) async fn debit<T: StoreTx>(
    tx: &mut T,
    user: &User,
    charge: Charge,
) -> Result<(), ServiceError> {
    let (applied, balance, requested, available) = match charge {
        Charge::Leave(days) => (
            tx.adjust_leave_balance(user.id, -days).await?,
            "leave",
            days,
            user.leave_balance,
        ),
        Charge::CompOff(days) => (
            tx.adjust_comp_off_balance(user.id, -days).await?,
            "comp-off",
            days,
            user.comp_off_balance,
        ),
        Charge::Free => return Ok(()),
    };
    if applied {
        Ok(())
    } else {
        Err(ServiceError::BalanceInsufficient {
            balance,
            requested,
            available,
        })
    }
}

/// Gives back a charge taken earlier.
pub(crate) async fn credit_back<T: StoreTx>(
    tx: &mut T,
    user_id: u64,
    charge: Charge,
) -> Result<(), ServiceError> {
    match charge {
        Charge::Leave(days) => {
            tx.adjust_leave_balance(user_id, days).await?;
        }
        Charge::CompOff(days) => {
            tx.adjust_comp_off_balance(user_id, days).await?;
        }
        Charge::Free => {}
    }
    Ok(())
}

impl<S: Store> Workflow<S> {
    /// Current balances, running the monthly accrual first.
    pub async fn get_balances(&self, actor: &Actor, user_id: u64) -> Result<Balances, ServiceError> {
        actor.require_self_or_admin(user_id)?;

        let mut tx = self.store.begin().await?;
        let mut user = active_user(&mut tx, user_id).await?;
        let credited = credit_monthly_leave_if_needed(
            &mut tx,
            &mut user,
            self.clock.today(),
            self.policy.monthly_leave_unit,
        )
        .await?;
        tx.commit().await?;

        if credited > 0.0 {
            info!(user_id, credited, "Leave balance accrued");
        }
        Ok(Balances {
            leave_balance: user.leave_balance,
            comp_off_balance: user.comp_off_balance,
            credited_this_call: credited,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth { year, month }
    }

    #[test]
    fn first_use_credits_one_unit() {
        assert_eq!(credit_due(None, ym(2025, 4), 1.5), Some(CreditMode::Add(1.5)));
    }

    #[test]
    fn same_month_credits_nothing() {
        assert_eq!(credit_due(Some(ym(2025, 4)), ym(2025, 4), 1.0), None);
    }

    #[test]
    fn gap_within_year_credits_each_month() {
        assert_eq!(
            credit_due(Some(ym(2025, 1)), ym(2025, 4), 1.0),
            Some(CreditMode::Add(3.0))
        );
    }

    #[test]
    fn new_year_resets_to_one_unit() {
        assert_eq!(
            credit_due(Some(ym(2024, 11)), ym(2025, 2), 1.0),
            Some(CreditMode::Reset(1.0))
        );
    }

    #[test]
    fn marker_ahead_of_clock_credits_nothing() {
        assert_eq!(credit_due(Some(ym(2026, 1)), ym(2025, 12), 1.0), None);
        assert_eq!(credit_due(Some(ym(2025, 6)), ym(2025, 5), 1.0), None);
    }
}
