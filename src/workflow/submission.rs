use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::ledger::{credit_monthly_leave_if_needed, ensure_covered};
use super::notify::Notification;
use super::{Actor, Workflow, active_user, display_date};
use crate::error::ServiceError;
use crate::model::approval::{ApprovalRecord, RequestKind, RequestStatus};
use crate::model::leave_request::{LeaveDraft, LeavePatch, LeaveRequest, LeaveType, NewLeave};
use crate::model::period::DateSpan;
use crate::model::reimbursement::{NewReimbursement, Reimbursement};
use crate::model::user::Balances;
use crate::store::{LeaveQuery, Store, StoreTx};

/// Spans of this many days or more need a reason.
pub const REASON_REQUIRED_FROM_DAYS: i64 = 3;

const ACTIVE_STATUSES: [RequestStatus; 2] = [RequestStatus::Pending, RequestStatus::Approved];

pub enum RequestPayload {
    Leave(NewLeave),
    Reimbursement(NewReimbursement),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmitReceipt {
    #[schema(example = 42)]
    pub request_id: u64,
    pub kind: RequestKind,
    pub balances: Balances,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveDetail {
    pub leave: LeaveRequest,
    pub approvals: Vec<ApprovalRecord>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReimbursementDetail {
    pub reimbursement: Reimbursement,
    pub approvals: Vec<ApprovalRecord>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by owner (administrators only)
    pub user_id: Option<u64>,
    #[schema(example = "PENDING")]
    /// Filter by leave status
    pub status: Option<RequestStatus>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeavePage {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Shape rules re-checked on every submission and edit.
pub(crate) fn validate_leave_shape(
    leave_type: LeaveType,
    span: &DateSpan,
    reason: Option<&str>,
) -> Result<(), ServiceError> {
    if leave_type == LeaveType::HalfDay && !span.is_single_day() {
        return Err(ServiceError::validation(
            "half-day leave must start and end on the same day",
        ));
    }
    let needs_reason =
        leave_type == LeaveType::Wfh || span.day_count() >= REASON_REQUIRED_FROM_DAYS;
    if needs_reason && reason.is_none_or(|r| r.trim().is_empty()) {
        return Err(ServiceError::validation(format!(
            "a reason is required for work-from-home and for leave of {REASON_REQUIRED_FROM_DAYS} days or more"
        )));
    }
    Ok(())
}

/// First active request other than `exclude` whose dates touch `span`.
pub(crate) fn find_overlap(
    existing: &[LeaveRequest],
    span: &DateSpan,
    exclude: Option<u64>,
) -> Option<u64> {
    existing
        .iter()
        .filter(|l| Some(l.id) != exclude && l.is_active())
        .find(|l| l.span().overlaps(span))
        .map(|l| l.id)
}

fn span_of(start: chrono::NaiveDate, end: chrono::NaiveDate) -> Result<DateSpan, ServiceError> {
    DateSpan::new(start, end)
        .ok_or_else(|| ServiceError::validation("start_date cannot be after end_date"))
}

impl<S: Store> Workflow<S> {
    pub async fn submit_request(
        &self,
        actor: &Actor,
        payload: RequestPayload,
    ) -> Result<SubmitReceipt, ServiceError> {
        match payload {
            RequestPayload::Leave(leave) => self.submit_leave(actor, leave).await,
            RequestPayload::Reimbursement(claim) => self.submit_reimbursement(actor, claim).await,
        }
    }

    pub async fn submit_leave(
        &self,
        actor: &Actor,
        payload: NewLeave,
    ) -> Result<SubmitReceipt, ServiceError> {
        let span = span_of(payload.start_date, payload.end_date)?;
        let reason = non_blank(payload.reason);
        validate_leave_shape(payload.leave_type, &span, reason.as_deref())?;
        if payload.responsible_person_id == Some(actor.user_id) {
            return Err(ServiceError::validation(
                "you cannot be your own responsible person",
            ));
        }

        let mut tx = self.store.begin().await?;
        let mut user = active_user(&mut tx, actor.user_id).await?;
        let credited = credit_monthly_leave_if_needed(
            &mut tx,
            &mut user,
            self.clock.today(),
            self.policy.monthly_leave_unit,
        )
        .await?;

        ensure_covered(&user, payload.leave_type.charge(&span))?;

        let existing = tx.leaves_of(user.id, &ACTIVE_STATUSES).await?;
        if let Some(conflict) = find_overlap(&existing, &span, None) {
            return Err(ServiceError::OverlapConflict(conflict));
        }

        let approvers = self.directory.approvers_for(&mut tx, user.id).await?;
        if approvers.is_empty() {
            return Err(ServiceError::NoApprover);
        }

        let draft = LeaveDraft {
            owner_id: user.id,
            leave_type: payload.leave_type,
            span,
            reason,
            status: RequestStatus::Pending,
            responsible_person_id: payload.responsible_person_id,
            auto_absence_date: None,
        };
        let request_id = tx.insert_leave(&draft).await?;
        for approver_id in &approvers {
            tx.insert_approval(&ApprovalRecord::pending(
                RequestKind::Leave,
                request_id,
                *approver_id,
            ))
            .await?;
        }
        tx.commit().await?;

        info!(
            request_id,
            user_id = user.id,
            leave_type = %draft.leave_type,
            approvers = approvers.len(),
            "Leave request submitted"
        );
        self.notify(Notification {
            recipients: approvers,
            subject: format!("Leave request #{request_id} awaits your approval"),
            lines: vec![
                format!("Employee: {}", user.username),
                format!("Type: {}", draft.leave_type),
                format!(
                    "Dates: {} to {}",
                    display_date(span.start),
                    display_date(span.end)
                ),
                format!("Days: {}", draft.leave_type.day_count(&span)),
                format!("Reason: {}", draft.reason.as_deref().unwrap_or("-")),
            ],
        });

        Ok(SubmitReceipt {
            request_id,
            kind: RequestKind::Leave,
            balances: Balances {
                leave_balance: user.leave_balance,
                comp_off_balance: user.comp_off_balance,
                credited_this_call: credited,
            },
        })
    }

    pub async fn submit_reimbursement(
        &self,
        actor: &Actor,
        claim: NewReimbursement,
    ) -> Result<SubmitReceipt, ServiceError> {
        if !claim.amount.is_finite() || claim.amount <= 0.0 {
            return Err(ServiceError::validation("amount must be greater than zero"));
        }
        if claim.category.trim().is_empty() {
            return Err(ServiceError::validation("category is required"));
        }
        if claim.description.trim().is_empty() {
            return Err(ServiceError::validation("description is required"));
        }
        if claim.expense_date > self.clock.today() {
            return Err(ServiceError::validation("expense_date cannot be in the future"));
        }

        let mut tx = self.store.begin().await?;
        let user = active_user(&mut tx, actor.user_id).await?;
        let approvers = self.directory.approvers_for(&mut tx, user.id).await?;
        if approvers.is_empty() {
            return Err(ServiceError::NoApprover);
        }

        let request_id = tx.insert_reimbursement(user.id, &claim).await?;
        for approver_id in &approvers {
            tx.insert_approval(&ApprovalRecord::pending(
                RequestKind::Reimbursement,
                request_id,
                *approver_id,
            ))
            .await?;
        }
        tx.commit().await?;

        info!(request_id, user_id = user.id, amount = claim.amount, "Reimbursement submitted");
        self.notify(Notification {
            recipients: approvers,
            subject: format!("Reimbursement #{request_id} awaits your approval"),
            lines: vec![
                format!("Employee: {}", user.username),
                format!("Category: {}", claim.category.trim()),
                format!("Amount: {:.2}", claim.amount),
                format!("Expense date: {}", display_date(claim.expense_date)),
            ],
        });

        Ok(SubmitReceipt {
            request_id,
            kind: RequestKind::Reimbursement,
            balances: Balances {
                leave_balance: user.leave_balance,
                comp_off_balance: user.comp_off_balance,
                credited_this_call: 0.0,
            },
        })
    }

    /// Edits a request. Owners may edit while it is pending; administrators
    /// at any time, but never its status. Once decided, only the notes of a
    /// request can change since its charge and attendance are settled.
    pub async fn update_leave(
        &self,
        actor: &Actor,
        request_id: u64,
        patch: LeavePatch,
    ) -> Result<LeaveRequest, ServiceError> {
        let mut tx = self.store.begin().await?;
        let mut leave = match tx.lock_leave(request_id).await? {
            Some(leave) if !leave.is_deleted() => leave,
            _ => return Err(ServiceError::NotFound("leave request")),
        };

        let patch = if actor.is_administrator() {
            if patch.status.is_some_and(|status| status != leave.status) {
                return Err(ServiceError::validation(
                    "status changes go through the approve/reject endpoints",
                ));
            }
            patch
        } else {
            if actor.user_id != leave.owner_id {
                return Err(ServiceError::Forbidden("Only the owner can edit this request"));
            }
            if leave.status != RequestStatus::Pending {
                return Err(ServiceError::Forbidden("Only pending requests can be edited"));
            }
            patch.strip_privileged()
        };

        let span = span_of(
            patch.start_date.unwrap_or(leave.start_date),
            patch.end_date.unwrap_or(leave.end_date),
        )?;
        let reshaped = span != leave.span()
            || patch.leave_type.is_some_and(|t| t != leave.leave_type)
            || patch.owner_id.is_some_and(|owner| owner != leave.owner_id);
        if reshaped && leave.status.is_terminal() {
            return Err(ServiceError::validation(
                "dates, type and owner of a decided request cannot change",
            ));
        }

        if let Some(leave_type) = patch.leave_type {
            leave.leave_type = leave_type;
        }
        leave.start_date = span.start;
        leave.end_date = span.end;
        if patch.reason.is_some() {
            leave.reason = non_blank(patch.reason);
        }
        if patch.responsible_person_id.is_some() {
            leave.responsible_person_id = patch.responsible_person_id;
        }
        if let Some(owner_id) = patch.owner_id {
            active_user(&mut tx, owner_id).await?;
            leave.owner_id = owner_id;
        }
        if patch.rejection_reason.is_some() {
            leave.rejection_reason = non_blank(patch.rejection_reason);
        }

        validate_leave_shape(leave.leave_type, &span, leave.reason.as_deref())?;
        let existing = tx.leaves_of(leave.owner_id, &ACTIVE_STATUSES).await?;
        if let Some(conflict) = find_overlap(&existing, &span, Some(leave.id)) {
            return Err(ServiceError::OverlapConflict(conflict));
        }

        tx.save_leave(&leave).await?;
        tx.commit().await?;
        info!(request_id, editor = actor.user_id, "Leave request updated");
        Ok(leave)
    }

    /// Soft delete; owners only while pending.
    pub async fn delete_leave(&self, actor: &Actor, request_id: u64) -> Result<(), ServiceError> {
        let mut tx = self.store.begin().await?;
        let mut leave = match tx.lock_leave(request_id).await? {
            Some(leave) if !leave.admin_deleted => leave,
            _ => return Err(ServiceError::NotFound("leave request")),
        };

        if actor.is_administrator() {
            leave.admin_deleted = true;
        } else if actor.user_id == leave.owner_id {
            if leave.employee_deleted {
                return Err(ServiceError::NotFound("leave request"));
            }
            if leave.status != RequestStatus::Pending {
                return Err(ServiceError::Forbidden("Only pending requests can be deleted"));
            }
            leave.employee_deleted = true;
        } else {
            return Err(ServiceError::Forbidden("Only the owner can delete this request"));
        }

        tx.save_leave(&leave).await?;
        tx.commit().await?;
        info!(request_id, deleted_by = actor.user_id, "Leave request deleted");
        Ok(())
    }

    pub async fn get_leave(&self, actor: &Actor, request_id: u64) -> Result<LeaveDetail, ServiceError> {
        let mut tx = self.store.begin().await?;
        let leave = match tx.lock_leave(request_id).await? {
            Some(leave) if !leave.admin_deleted => leave,
            _ => return Err(ServiceError::NotFound("leave request")),
        };
        let approvals = tx.approvals(RequestKind::Leave, request_id).await?;
        tx.commit().await?;

        let is_owner = actor.user_id == leave.owner_id;
        if is_owner && leave.employee_deleted {
            return Err(ServiceError::NotFound("leave request"));
        }
        let is_approver = approvals.iter().any(|r| r.approver_id == actor.user_id);
        if !(is_owner || is_approver || actor.is_administrator()) {
            return Err(ServiceError::Forbidden("Not allowed to view this request"));
        }
        Ok(LeaveDetail { leave, approvals })
    }

    pub async fn list_leaves(
        &self,
        actor: &Actor,
        filter: LeaveFilter,
    ) -> Result<LeavePage, ServiceError> {
        let owner_id = if actor.is_administrator() {
            filter.user_id
        } else {
            if filter.user_id.is_some_and(|id| id != actor.user_id) {
                return Err(ServiceError::Forbidden("Admin/HR only"));
            }
            Some(actor.user_id)
        };

        let per_page = filter.per_page.unwrap_or(10).clamp(1, 100);
        let page = filter.page.unwrap_or(1).max(1);
        let query = LeaveQuery {
            owner_id,
            status: filter.status,
            hide_employee_deleted: !actor.is_administrator(),
            limit: per_page,
            offset: (page - 1) * per_page,
        };

        let mut tx = self.store.begin().await?;
        let (data, total) = tx.list_leaves(&query).await?;
        tx.commit().await?;

        Ok(LeavePage {
            data,
            page,
            per_page,
            total,
        })
    }

    pub async fn get_reimbursement(
        &self,
        actor: &Actor,
        request_id: u64,
    ) -> Result<ReimbursementDetail, ServiceError> {
        let mut tx = self.store.begin().await?;
        let reimbursement = tx
            .lock_reimbursement(request_id)
            .await?
            .ok_or(ServiceError::NotFound("reimbursement"))?;
        let approvals = tx.approvals(RequestKind::Reimbursement, request_id).await?;
        tx.commit().await?;

        let is_approver = approvals.iter().any(|r| r.approver_id == actor.user_id);
        if actor.user_id != reimbursement.owner_id && !is_approver && !actor.is_administrator() {
            return Err(ServiceError::Forbidden("Not allowed to view this request"));
        }
        Ok(ReimbursementDetail {
            reimbursement,
            approvals,
        })
    }
}
