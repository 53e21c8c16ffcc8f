use chrono::NaiveDateTime;
use tracing::info;

use super::attendance_sync::project_leave;
use super::ledger::{credit_monthly_leave_if_needed, debit};
use super::notify::Notification;
use super::quorum::{LeaveQuorum, QuorumContext, QuorumStrategy, ReimbursementQuorum, Verdict};
use super::{Actor, Workflow, active_user, display_date};
use crate::error::ServiceError;
use crate::model::approval::{ApprovalRecord, ApproverRole, Decision, RequestKind, RequestStatus};
use crate::model::leave_request::LeaveRequest;
use crate::model::reimbursement::Reimbursement;
use crate::store::{Store, StoreTx};

/// The slots an actor votes through, or why they have none.
///
/// An administrator who also manages the requester votes through both
/// their manager slot and an administrator slot.
fn voting_roles(
    actor: &Actor,
    owner_id: u64,
    records: &[ApprovalRecord],
) -> Result<Vec<ApproverRole>, ServiceError> {
    if actor.user_id == owner_id {
        return Err(ServiceError::SelfApprovalForbidden);
    }
    let holds_manager_slot = records
        .iter()
        .any(|r| r.approver_id == actor.user_id && r.is_manager_slot());
    let mut roles = Vec::with_capacity(2);
    if holds_manager_slot {
        roles.push(ApproverRole::Manager);
    }
    if actor.is_administrator() {
        roles.push(ApproverRole::Administrator);
    }
    if roles.is_empty() {
        return Err(ServiceError::NotAnApprover);
    }
    Ok(roles)
}

/// Deactivated approvers lose their vote even while their token is valid.
async fn ensure_active_actor<T: StoreTx>(tx: &mut T, actor: &Actor) -> Result<(), ServiceError> {
    match tx.user(actor.user_id).await? {
        Some(user) if user.is_active => Ok(()),
        _ => Err(ServiceError::NotFound("user")),
    }
}

#[allow(clippy::too_many_arguments)]
async fn cast_votes<T: StoreTx>(
    tx: &mut T,
    kind: RequestKind,
    request_id: u64,
    actor: &Actor,
    roles: &[ApproverRole],
    decision: Decision,
    reason: Option<&str>,
    acted_at: NaiveDateTime,
) -> Result<(), ServiceError> {
    for role in roles {
        tx.upsert_vote(
            kind,
            request_id,
            actor.user_id,
            *role,
            decision.as_status(),
            reason,
            acted_at,
        )
        .await?;
        info!(
            %kind,
            request_id,
            approver_id = actor.user_id,
            role = %role,
            decision = %decision.as_status(),
            "Vote recorded"
        );
    }
    Ok(())
}

fn rejection_reason(verdict: &Verdict) -> Option<&str> {
    match verdict {
        Verdict::Rejected(reason) => Some(reason.as_str()),
        _ => None,
    }
}

/// Other approved leaves of the same owner touching `leave`'s dates.
async fn overlaps_approved_leave<T: StoreTx>(
    tx: &mut T,
    leave: &LeaveRequest,
) -> Result<bool, ServiceError> {
    let span = leave.span();
    let approved = tx.leaves_of(leave.owner_id, &[RequestStatus::Approved]).await?;
    Ok(approved
        .iter()
        .any(|other| other.id != leave.id && other.span().overlaps(&span)))
}

impl<S: Store> Workflow<S> {
    /// Records `decision` from `actor` and re-aggregates the request.
    ///
    /// Returns the request's status after the action. Votes on a request
    /// that is already terminal are stored but change nothing else.
    pub async fn act_on_request(
        &self,
        actor: &Actor,
        kind: RequestKind,
        request_id: u64,
        decision: Decision,
        reason: Option<String>,
    ) -> Result<RequestStatus, ServiceError> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        match kind {
            RequestKind::Leave => {
                self.act_on_leave(actor, request_id, decision, reason.as_deref())
                    .await
            }
            RequestKind::Reimbursement => {
                self.act_on_reimbursement(actor, request_id, decision, reason.as_deref())
                    .await
            }
        }
    }

    /// Re-runs aggregation without a new vote.
    pub async fn recompute(
        &self,
        kind: RequestKind,
        request_id: u64,
    ) -> Result<RequestStatus, ServiceError> {
        match kind {
            RequestKind::Leave => {
                let mut tx = self.store.begin().await?;
                let leave = lock_live_leave(&mut tx, request_id).await?;
                if leave.status.is_terminal() {
                    return Ok(leave.status);
                }
                let records = tx.approvals(RequestKind::Leave, request_id).await?;
                let (status, leave) = self
                    .resolve_leave(&mut tx, leave, &records, false)
                    .await?;
                tx.commit().await?;
                self.announce_leave(&leave);
                Ok(status)
            }
            RequestKind::Reimbursement => {
                let mut tx = self.store.begin().await?;
                let claim = tx
                    .lock_reimbursement(request_id)
                    .await?
                    .ok_or(ServiceError::NotFound("reimbursement"))?;
                if claim.status.is_terminal() {
                    return Ok(claim.status);
                }
                let records = tx.approvals(RequestKind::Reimbursement, request_id).await?;
                let (status, claim) = self
                    .resolve_reimbursement(&mut tx, claim, &records)
                    .await?;
                tx.commit().await?;
                self.announce_reimbursement(&claim);
                Ok(status)
            }
        }
    }

    async fn act_on_leave(
        &self,
        actor: &Actor,
        request_id: u64,
        decision: Decision,
        reason: Option<&str>,
    ) -> Result<RequestStatus, ServiceError> {
        let mut tx = self.store.begin().await?;
        let leave = lock_live_leave(&mut tx, request_id).await?;
        active_user(&mut tx, leave.owner_id).await?;
        ensure_active_actor(&mut tx, actor).await?;

        let records = tx.approvals(RequestKind::Leave, request_id).await?;
        let roles = voting_roles(actor, leave.owner_id, &records)?;
        cast_votes(
            &mut tx,
            RequestKind::Leave,
            request_id,
            actor,
            &roles,
            decision,
            reason,
            self.clock.now(),
        )
        .await?;

        if leave.status.is_terminal() {
            tx.commit().await?;
            return Ok(leave.status);
        }

        let records = tx.approvals(RequestKind::Leave, request_id).await?;
        let admin_approving =
            roles.contains(&ApproverRole::Administrator) && decision == Decision::Approve;
        let (status, leave) = self
            .resolve_leave(&mut tx, leave, &records, admin_approving)
            .await?;
        tx.commit().await?;

        self.announce_leave(&leave);
        Ok(status)
    }

    /// Applies the quorum verdict to a pending leave inside `tx`.
    async fn resolve_leave<T: StoreTx>(
        &self,
        tx: &mut T,
        mut leave: LeaveRequest,
        records: &[ApprovalRecord],
        admin_approving: bool,
    ) -> Result<(RequestStatus, LeaveRequest), ServiceError> {
        let ctx = QuorumContext {
            admin_approving,
            requester_is_manager: false,
            overlaps_approved_leave: overlaps_approved_leave(tx, &leave).await?,
        };
        let verdict = LeaveQuorum.compute_final_status(records, &ctx);

        match &verdict {
            Verdict::Pending => return Ok((RequestStatus::Pending, leave)),
            Verdict::Approved => {
                let mut owner = active_user(tx, leave.owner_id).await?;
                credit_monthly_leave_if_needed(
                    tx,
                    &mut owner,
                    self.clock.today(),
                    self.policy.monthly_leave_unit,
                )
                .await?;
                debit(tx, &owner, leave.charge()).await?;
                leave.status = RequestStatus::Approved;
                tx.save_leave(&leave).await?;
                let days = project_leave(tx, &leave).await?;
                info!(request_id = leave.id, attendance_days = days, "Leave approved");
            }
            Verdict::Rejected(reason) => {
                leave.status = RequestStatus::Rejected;
                leave.rejection_reason = Some(reason.clone());
                tx.save_leave(&leave).await?;
                info!(request_id = leave.id, reason = %reason, "Leave rejected");
            }
        }
        Ok((verdict.status(), leave))
    }

    async fn act_on_reimbursement(
        &self,
        actor: &Actor,
        request_id: u64,
        decision: Decision,
        reason: Option<&str>,
    ) -> Result<RequestStatus, ServiceError> {
        let mut tx = self.store.begin().await?;
        let claim = tx
            .lock_reimbursement(request_id)
            .await?
            .ok_or(ServiceError::NotFound("reimbursement"))?;
        active_user(&mut tx, claim.owner_id).await?;
        ensure_active_actor(&mut tx, actor).await?;

        let records = tx.approvals(RequestKind::Reimbursement, request_id).await?;
        let roles = voting_roles(actor, claim.owner_id, &records)?;
        cast_votes(
            &mut tx,
            RequestKind::Reimbursement,
            request_id,
            actor,
            &roles,
            decision,
            reason,
            self.clock.now(),
        )
        .await?;

        if claim.status.is_terminal() {
            tx.commit().await?;
            return Ok(claim.status);
        }

        let records = tx.approvals(RequestKind::Reimbursement, request_id).await?;
        let (status, claim) = self
            .resolve_reimbursement(&mut tx, claim, &records)
            .await?;
        tx.commit().await?;

        self.announce_reimbursement(&claim);
        Ok(status)
    }

    async fn resolve_reimbursement<T: StoreTx>(
        &self,
        tx: &mut T,
        mut claim: Reimbursement,
        records: &[ApprovalRecord],
    ) -> Result<(RequestStatus, Reimbursement), ServiceError> {
        let ctx = QuorumContext {
            requester_is_manager: !tx.managed_departments(claim.owner_id).await?.is_empty(),
            ..QuorumContext::default()
        };
        let verdict = ReimbursementQuorum.compute_final_status(records, &ctx);
        let status = verdict.status();
        if status == RequestStatus::Pending {
            return Ok((status, claim));
        }

        let reason = rejection_reason(&verdict);
        tx.set_reimbursement_status(claim.id, status, reason).await?;
        claim.status = status;
        claim.rejection_reason = reason.map(str::to_string);
        info!(request_id = claim.id, status = %status, "Reimbursement resolved");
        Ok((status, claim))
    }

    fn announce_leave(&self, leave: &LeaveRequest) {
        if !leave.status.is_terminal() {
            return;
        }
        let mut lines = vec![
            format!("Type: {}", leave.leave_type),
            format!(
                "Dates: {} to {}",
                display_date(leave.start_date),
                display_date(leave.end_date)
            ),
            format!("Status: {}", leave.status),
        ];
        if let Some(reason) = &leave.rejection_reason {
            lines.push(format!("Reason: {reason}"));
        }
        self.notify(Notification {
            recipients: vec![leave.owner_id],
            subject: format!("Leave request #{} {}", leave.id, leave.status),
            lines,
        });
    }

    fn announce_reimbursement(&self, claim: &Reimbursement) {
        if !claim.status.is_terminal() {
            return;
        }
        let mut lines = vec![
            format!("Category: {}", claim.category),
            format!("Amount: {:.2}", claim.amount),
            format!("Status: {}", claim.status),
        ];
        if let Some(reason) = &claim.rejection_reason {
            lines.push(format!("Reason: {reason}"));
        }
        self.notify(Notification {
            recipients: vec![claim.owner_id],
            subject: format!("Reimbursement #{} {}", claim.id, claim.status),
            lines,
        });
    }
}

/// Deleted requests cannot be acted on.
async fn lock_live_leave<T: StoreTx>(tx: &mut T, id: u64) -> Result<LeaveRequest, ServiceError> {
    match tx.lock_leave(id).await? {
        Some(leave) if !leave.is_deleted() => Ok(leave),
        _ => Err(ServiceError::NotFound("leave request")),
    }
}
