use tracing::debug;

use super::work_calendar;
use crate::model::attendance::Attendance;
use crate::model::leave_request::LeaveRequest;
use crate::store::{StoreError, StoreTx};

/// Writes an approved leave onto the attendance timeline.
///
/// Holidays and the owner's weekly-offs are skipped, and a day that already
/// carries a real check-in is left alone. Returns the number of days written.
pub(crate) async fn project_leave<T: StoreTx>(
    tx: &mut T,
    leave: &LeaveRequest,
) -> Result<usize, StoreError> {
    let span = leave.span();
    let calendar = work_calendar(tx, leave.owner_id, &span).await?;
    let status = leave.leave_type.attendance_status();

    let mut written = 0;
    for day in span.days() {
        if calendar.is_non_working(day) {
            continue;
        }
        if let Some(existing) = tx.attendance(leave.owner_id, day).await? {
            if existing.has_check_in() {
                debug!(user_id = leave.owner_id, %day, "Keeping checked-in attendance");
                continue;
            }
        }
        tx.upsert_attendance(&Attendance {
            user_id: leave.owner_id,
            date: day,
            status,
            check_in: None,
            check_out: None,
        })
        .await?;
        written += 1;
    }
    Ok(written)
}
