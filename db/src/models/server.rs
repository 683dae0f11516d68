use chrono::NaiveDateTime;
use common::misc::{BillingCycle, ProvisionStatus, ServerStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Server {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
    pub plan: String,
    pub game: String,
    pub variant: String,
    pub region: String,
    pub billing_cycle: BillingCycle,
    pub pending_billing_cycle: Option<BillingCycle>,
    pub status: ServerStatus,
    pub provision_status: ProvisionStatus,
    pub provision_error: Option<String>,
    pub pterodactyl_server_id: Option<i64>,
    pub pterodactyl_server_uuid: Option<String>,
    pub pterodactyl_server_identifier: Option<String>,
    pub pterodactyl_internal_id: Option<i64>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_checkout_session_id: Option<String>,
    pub subscription_name: String,
    pub external_id: Option<String>,
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Server {
    pub fn is_provisioned(&self) -> bool {
        self.pterodactyl_server_id.is_some()
    }
}

/// Identifiers the panel returns for a created or adopted server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelServerIds {
    pub id: i64,
    pub uuid: String,
    pub identifier: String,
    pub internal_id: Option<i64>,
}
