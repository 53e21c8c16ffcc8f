use super::common::*;
use crate::error::ServiceError;
use crate::model::approval::{ApproverRole, Decision, RequestKind, RequestStatus};
use crate::model::reimbursement::NewReimbursement;
use crate::store::memory::MemoryState;
use crate::workflow::Actor;

const PEER: u64 = 12;

fn claim(amount: f64) -> NewReimbursement {
    NewReimbursement {
        amount,
        category: "TRAVEL".to_string(),
        description: "Client visit cab fare".to_string(),
        expense_date: d(4, 7),
    }
}

/// MANAGER_A also manages a second department shared with PEER and MANAGER_B.
fn managers_office() -> MemoryState {
    office(5.0)
        .with_user(PEER, crate::model::role::Role::Employee, 0.0, 0.0)
        .with_department(300, &[MANAGER_A, MANAGER_B, PEER], &[MANAGER_A])
}

async fn submit_claim(harness: &Harness, owner: u64) -> u64 {
    harness
        .workflow
        .submit_reimbursement(&staff(owner), claim(1250.0))
        .await
        .expect("claim accepted")
        .request_id
}

async fn vote(harness: &Harness, actor: &Actor, id: u64, decision: Decision) -> RequestStatus {
    harness
        .workflow
        .act_on_request(actor, RequestKind::Reimbursement, id, decision, None)
        .await
        .expect("vote accepted")
}

#[actix_web::test]
async fn employee_claim_is_approved_by_either_path() {
    let harness = Harness::new(office(5.0));
    let by_managers = submit_claim(&harness, EMPLOYEE).await;
    let by_admin = submit_claim(&harness, COLLEAGUE).await;

    assert_eq!(
        vote(&harness, &staff(MANAGER_A), by_managers, Decision::Approve).await,
        RequestStatus::Pending
    );
    assert_eq!(
        vote(&harness, &staff(MANAGER_B), by_managers, Decision::Approve).await,
        RequestStatus::Approved
    );
    assert_eq!(
        vote(&harness, &admin(), by_admin, Decision::Approve).await,
        RequestStatus::Approved
    );

    let state = harness.state().await;
    assert_eq!(state.reimbursements[&by_admin].status, RequestStatus::Approved);
}

#[actix_web::test]
async fn manager_claim_needs_peers_and_administrator() {
    let harness = Harness::new(managers_office());
    let id = submit_claim(&harness, MANAGER_A).await;

    assert_eq!(
        vote(&harness, &admin(), id, Decision::Approve).await,
        RequestStatus::Pending
    );
    assert_eq!(
        vote(&harness, &staff(MANAGER_B), id, Decision::Approve).await,
        RequestStatus::Pending
    );
    assert_eq!(
        vote(&harness, &staff(PEER), id, Decision::Approve).await,
        RequestStatus::Approved
    );
}

#[actix_web::test]
async fn manager_claim_rejected_by_one_peer_stays_rejected() {
    let harness = Harness::new(managers_office());
    let id = submit_claim(&harness, MANAGER_A).await;

    vote(&harness, &staff(MANAGER_B), id, Decision::Approve).await;
    harness
        .workflow
        .act_on_request(
            &staff(PEER),
            RequestKind::Reimbursement,
            id,
            Decision::Reject,
            Some("Not a project expense".to_string()),
        )
        .await
        .expect("vote accepted");

    assert_eq!(
        vote(&harness, &admin(), id, Decision::Approve).await,
        RequestStatus::Rejected
    );
    let state = harness.state().await;
    assert_eq!(
        state.reimbursements[&id].rejection_reason.as_deref(),
        Some("Not a project expense")
    );
}

#[actix_web::test]
async fn claims_are_validated_before_anything_is_written() {
    let harness = Harness::new(office(5.0));
    let actor = staff(EMPLOYEE);

    let zero = harness.workflow.submit_reimbursement(&actor, claim(0.0)).await;
    assert!(matches!(zero, Err(ServiceError::Validation(_))));

    let mut blank = claim(10.0);
    blank.description = " ".to_string();
    let blank = harness.workflow.submit_reimbursement(&actor, blank).await;
    assert!(matches!(blank, Err(ServiceError::Validation(_))));

    let mut future = claim(10.0);
    future.expense_date = d(4, 10);
    let future = harness.workflow.submit_reimbursement(&actor, future).await;
    assert!(matches!(future, Err(ServiceError::Validation(_))));

    assert!(harness.state().await.reimbursements.is_empty());
}

#[actix_web::test]
async fn claim_detail_is_restricted() {
    let harness = Harness::new(office(5.0));
    let id = submit_claim(&harness, EMPLOYEE).await;

    let detail = harness
        .workflow
        .get_reimbursement(&staff(MANAGER_B), id)
        .await
        .expect("approver can read");
    assert_eq!(detail.approvals.len(), 2);

    let stranger = harness.workflow.get_reimbursement(&staff(COLLEAGUE), id).await;
    assert!(matches!(stranger, Err(ServiceError::Forbidden(_))));
}

#[actix_web::test]
async fn managing_hr_approval_also_counts_as_administrator_approval() {
    const HR: u64 = 2;
    let state = office(5.0)
        .with_user(HR, crate::model::role::Role::Hr, 0.0, 0.0)
        .with_department(300, &[HR, MANAGER_B], &[MANAGER_A]);
    let harness = Harness::new(state);
    let id = submit_claim(&harness, MANAGER_A).await;
    let hr = Actor {
        user_id: HR,
        role: crate::model::role::Role::Hr,
    };

    assert_eq!(
        vote(&harness, &hr, id, Decision::Approve).await,
        RequestStatus::Pending
    );
    assert_eq!(
        vote(&harness, &staff(MANAGER_B), id, Decision::Approve).await,
        RequestStatus::Approved
    );

    let state = harness.state().await;
    let hr_slots: Vec<_> = state
        .approvals
        .iter()
        .filter(|r| {
            r.request_kind == RequestKind::Reimbursement && r.request_id == id && r.approver_id == HR
        })
        .map(|r| (r.approver_role, r.status))
        .collect();
    assert_eq!(
        hr_slots,
        vec![
            (ApproverRole::Manager, RequestStatus::Approved),
            (ApproverRole::Administrator, RequestStatus::Approved),
        ]
    );
}
