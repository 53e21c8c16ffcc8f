//! Quorum rules turning per-approver votes into a request's final status.
//!
//! Leave and reimbursement requests share the approver-slot mechanism but
//! resolve differently, so each gets its own [`QuorumStrategy`].

use crate::model::approval::{ApprovalRecord, ApproverRole, RequestStatus};

pub const DEFAULT_REJECTION_REASON: &str = "Rejected by approver";
pub const OVERLAP_REJECTION_REASON: &str = "Overlapping leave already approved";

/// Facts about the triggering action that the votes alone do not carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuorumContext {
    /// An administrator is approving in this very action.
    pub admin_approving: bool,
    /// The requester manages a department themself.
    pub requester_is_manager: bool,
    /// The leave would overlap another approved leave of the same user.
    pub overlaps_approved_leave: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pending,
    Approved,
    Rejected(String),
}

impl Verdict {
    pub fn status(&self) -> RequestStatus {
        match self {
            Verdict::Pending => RequestStatus::Pending,
            Verdict::Approved => RequestStatus::Approved,
            Verdict::Rejected(_) => RequestStatus::Rejected,
        }
    }
}

pub trait QuorumStrategy {
    fn compute_final_status(&self, records: &[ApprovalRecord], ctx: &QuorumContext) -> Verdict;
}

/// A rejection anywhere is absorbing; the earliest one supplies the reason.
fn rejection(records: &[ApprovalRecord]) -> Option<Verdict> {
    records
        .iter()
        .filter(|r| r.status == RequestStatus::Rejected)
        .min_by_key(|r| r.acted_at)
        .map(|r| {
            let reason = r
                .reason
                .as_deref()
                .map(str::trim)
                .filter(|reason| !reason.is_empty())
                .unwrap_or(DEFAULT_REJECTION_REASON);
            Verdict::Rejected(reason.to_string())
        })
}

fn all_managers_approved(records: &[ApprovalRecord]) -> bool {
    let mut managers = records.iter().filter(|r| r.is_manager_slot()).peekable();
    managers.peek().is_some() && managers.all(|r| r.status == RequestStatus::Approved)
}

fn administrator_approved(records: &[ApprovalRecord]) -> bool {
    records
        .iter()
        .any(|r| r.approver_role == ApproverRole::Administrator && r.status == RequestStatus::Approved)
}

pub struct LeaveQuorum;

impl QuorumStrategy for LeaveQuorum {
    fn compute_final_status(&self, records: &[ApprovalRecord], ctx: &QuorumContext) -> Verdict {
        if let Some(rejected) = rejection(records) {
            return rejected;
        }
        if ctx.admin_approving {
            return Verdict::Approved;
        }
        if all_managers_approved(records) {
            return if ctx.overlaps_approved_leave {
                Verdict::Rejected(OVERLAP_REJECTION_REASON.to_string())
            } else {
                Verdict::Approved
            };
        }
        Verdict::Pending
    }
}

pub struct ReimbursementQuorum;

impl QuorumStrategy for ReimbursementQuorum {
    fn compute_final_status(&self, records: &[ApprovalRecord], ctx: &QuorumContext) -> Verdict {
        if let Some(rejected) = rejection(records) {
            return rejected;
        }
        let managers = all_managers_approved(records);
        let administrator = administrator_approved(records);
        let approved = if ctx.requester_is_manager {
            managers && administrator
        } else {
            managers || administrator
        };
        if approved {
            Verdict::Approved
        } else {
            Verdict::Pending
        }
    }
}
