use common::misc::BillingCycle;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutCreateRequest {
    pub name: String,
    pub plan: String,
    pub game: String,
    pub variant: String,
    pub region: String,
    pub billing_cycle: BillingCycle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutResponse {
    pub server_id: i64,
    pub session_id: String,
    pub url: String,
}
