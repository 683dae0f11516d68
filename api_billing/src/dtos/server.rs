use chrono::NaiveDateTime;
use common::{
    billing::InvoiceSummary,
    misc::{BillingCycle, ProvisionStatus, ServerStatus},
};
use db::models::server::Server;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct BillingCycleRequest {
    pub billing_cycle: BillingCycle,
}

/// Server as shown to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct ServerResponse {
    pub id: i64,
    pub name: String,
    pub plan: String,
    pub game: String,
    pub variant: String,
    pub region: String,
    pub status: ServerStatus,
    pub provision_status: ProvisionStatus,
    pub billing_cycle: BillingCycle,
    pub pending_billing_cycle: Option<BillingCycle>,
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<NaiveDateTime>,
    pub panel_identifier: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<Server> for ServerResponse {
    fn from(server: Server) -> Self {
        ServerResponse {
            id: server.id,
            name: server.name,
            plan: server.plan,
            game: server.game,
            variant: server.variant,
            region: server.region,
            status: server.status,
            provision_status: server.provision_status,
            billing_cycle: server.billing_cycle,
            pending_billing_cycle: server.pending_billing_cycle,
            cancel_at_period_end: server.cancel_at_period_end,
            current_period_end: server.current_period_end,
            panel_identifier: server.pterodactyl_server_identifier,
            created_at: server.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServersResponse {
    pub servers: Vec<ServerResponse>,
}

/// Full row including provisioning diagnostics, for admins.
#[derive(Debug, Serialize)]
pub struct AdminServersResponse {
    pub servers: Vec<Server>,
}

#[derive(Debug, Serialize)]
pub struct InvoicesResponse {
    pub invoices: Vec<InvoiceSummary>,
}
