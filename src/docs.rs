use crate::api::DecisionNote;
use crate::api::admin::RunDate;
use crate::model::approval::{ApprovalRecord, ApproverRole, Decision, RequestKind, RequestStatus};
use crate::model::attendance::{Attendance, AttendanceStatus};
use crate::model::comp_off::{CompOffGrant, GrantSource, GrantStatus, NewCompOffGrant};
use crate::model::correction::{AttendanceCorrection, NewCorrection};
use crate::model::leave_request::{LeavePatch, LeaveRequest, LeaveType, NewLeave};
use crate::model::reimbursement::{NewReimbursement, Reimbursement};
use crate::model::user::Balances;
use crate::workflow::absence_sweep::SweepReport;
use crate::workflow::comp_off::CompOffReport;
use crate::workflow::submission::{
    LeaveDetail, LeaveFilter, LeavePage, ReimbursementDetail, SubmitReceipt,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Leave & Approval API",
        version = "1.0.0",
        description = r#"
## Leave, reimbursement and attendance approvals

### 🔹 Key Features
- **Leave Management**
  - Apply for leave, edit or withdraw pending requests, multi-manager approval
- **Reimbursements**
  - Submit claims; managers and HR/Admin approve
- **Balances**
  - Monthly leave accrual and comp-off balances
- **Attendance**
  - Approved leave on the timeline, corrections, nightly absence sweep

### 🔐 Security
Every endpoint is protected using **JWT Bearer authentication**.
Only **Admin** or **HR** can grant comp-off, decide corrections, or run admin jobs.

### 📦 Response Format
- JSON-based RESTful responses
- Errors carry `message` and `error` fields
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::update_leave,
        crate::api::leave_request::delete_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::reimbursement::create_reimbursement,
        crate::api::reimbursement::get_reimbursement,
        crate::api::reimbursement::approve_reimbursement,
        crate::api::reimbursement::reject_reimbursement,

        crate::api::balance::my_balance,
        crate::api::balance::user_balance,

        crate::api::comp_off::grant_comp_off,
        crate::api::comp_off::list_comp_off,
        crate::api::comp_off::delete_comp_off,

        crate::api::attendance::request_correction,
        crate::api::attendance::approve_correction,
        crate::api::attendance::reject_correction,

        crate::api::admin::run_absence_sweep,
        crate::api::admin::run_comp_off_detection,
        crate::api::admin::recompute,
        crate::api::admin::invalidate_department
    ),
    components(
        schemas(
            LeaveType,
            RequestStatus,
            RequestKind,
            ApproverRole,
            Decision,
            ApprovalRecord,
            NewLeave,
            LeavePatch,
            LeaveRequest,
            LeaveFilter,
            LeavePage,
            LeaveDetail,
            SubmitReceipt,
            NewReimbursement,
            Reimbursement,
            ReimbursementDetail,
            Balances,
            GrantStatus,
            GrantSource,
            NewCompOffGrant,
            CompOffGrant,
            AttendanceStatus,
            Attendance,
            NewCorrection,
            AttendanceCorrection,
            DecisionNote,
            RunDate,
            SweepReport,
            CompOffReport
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request APIs"),
        (name = "Reimbursement", description = "Reimbursement claim APIs"),
        (name = "Balance", description = "Leave and comp-off balance APIs"),
        (name = "CompOff", description = "Comp-off grant APIs"),
        (name = "Attendance", description = "Attendance correction APIs"),
        (name = "Admin", description = "Maintenance jobs for HR/Admin"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
