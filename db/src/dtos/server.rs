use common::misc::BillingCycle;
use uuid::Uuid;

pub struct ServerCreateRequest {
    pub user_id: Uuid,
    pub name: String,
    pub plan: String,
    pub game: String,
    pub variant: String,
    pub region: String,
    pub billing_cycle: BillingCycle,
}
