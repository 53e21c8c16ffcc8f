pub mod admin;
pub mod attendance;
pub mod balance;
pub mod comp_off;
pub mod leave_request;
pub mod reimbursement;

use serde::Deserialize;
use utoipa::ToSchema;

use crate::store::mysql::MySqlStore;
use crate::workflow::Workflow;

pub type AppWorkflow = Workflow<MySqlStore>;

/// Optional note sent with a rejection.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DecisionNote {
    #[schema(example = "Release week")]
    pub reason: Option<String>,
}
