use std::sync::Arc;

use common::{catalog::Catalog, stripe::StripeGateway};
use db::PgStore;
use panel::PanelClient;
use provisioner::PgQueue;

use crate::Billing;

/// Production dependencies shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: PgStore,
    pub panel: PanelClient,
    pub queue: PgQueue,
    pub gateway: StripeGateway,
    pub catalog: Arc<Catalog>,
}

impl AppState {
    pub fn billing(&self) -> Billing<'_, PgStore, PanelClient, PgQueue, StripeGateway> {
        Billing {
            store: &self.store,
            panel: &self.panel,
            queue: &self.queue,
            gateway: &self.gateway,
            catalog: &self.catalog,
        }
    }
}
