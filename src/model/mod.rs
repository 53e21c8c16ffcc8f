pub mod approval;
pub mod attendance;
pub mod calendar;
pub mod comp_off;
pub mod correction;
pub mod leave_request;
pub mod period;
pub mod reimbursement;
pub mod role;
pub mod user;
