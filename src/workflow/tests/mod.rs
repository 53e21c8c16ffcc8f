mod common;

mod reimbursement;
mod sweep;
