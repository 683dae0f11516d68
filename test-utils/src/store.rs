use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{NaiveDateTime, Utc};
use common::{
    error::{AppError, Res},
    misc::{BillingCycle, ProvisionStatus, ServerStatus},
};
use db::{
    ServerStore, UserStore,
    dtos::{server::ServerCreateRequest, user::UserCreateRequest},
    models::{
        server::{PanelServerIds, Server},
        user::User,
    },
};
use uuid::Uuid;

#[derive(Default)]
struct State {
    servers: BTreeMap<i64, Server>,
    users: HashMap<Uuid, User>,
    next_id: i64,
}

/// In-memory `ServerStore` + `UserStore`. Updates of missing rows are no-ops,
/// like an `UPDATE ... WHERE id = $1` that matches nothing.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("store mutex poisoned")
    }

    pub fn insert_user(&self, user: User) -> User {
        self.state().users.insert(user.id, user.clone());
        user
    }

    pub fn insert_server(&self, server: Server) -> Server {
        let mut state = self.state();
        state.next_id = state.next_id.max(server.id);
        state.servers.insert(server.id, server.clone());
        server
    }

    pub fn server(&self, id: i64) -> Option<Server> {
        self.state().servers.get(&id).cloned()
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.state().users.get(&id).cloned()
    }

    fn update_server(&self, id: i64, apply: impl FnOnce(&mut Server)) {
        if let Some(server) = self.state().servers.get_mut(&id) {
            apply(server);
            server.updated_at = now();
        }
    }

    fn update_user(&self, id: Uuid, apply: impl FnOnce(&mut User)) {
        if let Some(user) = self.state().users.get_mut(&id) {
            apply(user);
            user.updated_at = now();
        }
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

impl ServerStore for MemoryStore {
    async fn create_server(&self, data: ServerCreateRequest) -> Res<Server> {
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        let server = Server {
            id,
            user_id: data.user_id,
            name: data.name,
            plan: data.plan,
            game: data.game,
            variant: data.variant,
            region: data.region,
            billing_cycle: data.billing_cycle,
            pending_billing_cycle: None,
            status: ServerStatus::Pending,
            provision_status: ProvisionStatus::Unprovisioned,
            provision_error: None,
            pterodactyl_server_id: None,
            pterodactyl_server_uuid: None,
            pterodactyl_server_identifier: None,
            pterodactyl_internal_id: None,
            stripe_subscription_id: None,
            stripe_checkout_session_id: None,
            subscription_name: format!("server_{}", id),
            external_id: None,
            cancel_at_period_end: false,
            current_period_end: None,
            created_at: now(),
            updated_at: now(),
        };
        state.servers.insert(id, server.clone());
        Ok(server)
    }

    async fn get_server(&self, id: i64) -> Res<Option<Server>> {
        Ok(self.server(id))
    }

    async fn find_by_subscription(&self, subscription_id: &str) -> Res<Option<Server>> {
        Ok(self
            .state()
            .servers
            .values()
            .find(|s| s.stripe_subscription_id.as_deref() == Some(subscription_id))
            .cloned())
    }

    async fn list_servers_for_user(&self, user_id: Uuid) -> Res<Vec<Server>> {
        Ok(self
            .state()
            .servers
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_servers(&self) -> Res<Vec<Server>> {
        Ok(self.state().servers.values().cloned().collect())
    }

    async fn set_provision_status(
        &self,
        id: i64,
        status: ProvisionStatus,
        error: Option<&str>,
    ) -> Res<()> {
        self.update_server(id, |s| {
            s.provision_status = status;
            s.provision_error = error.map(str::to_string);
        });
        Ok(())
    }

    async fn set_external_id(&self, id: i64, external_id: &str) -> Res<()> {
        self.update_server(id, |s| s.external_id = Some(external_id.to_string()));
        Ok(())
    }

    async fn attach_panel_server(&self, id: i64, panel: &PanelServerIds) -> Res<()> {
        self.update_server(id, |s| {
            s.pterodactyl_server_id = Some(panel.id);
            s.pterodactyl_server_uuid = Some(panel.uuid.clone());
            s.pterodactyl_server_identifier = Some(panel.identifier.clone());
            s.pterodactyl_internal_id = panel.internal_id;
            s.provision_status = ProvisionStatus::Provisioned;
            s.provision_error = None;
            if matches!(s.status, ServerStatus::Pending | ServerStatus::Active) {
                s.status = ServerStatus::Active;
            }
        });
        Ok(())
    }

    async fn detach_panel_server(&self, id: i64) -> Res<()> {
        self.update_server(id, |s| {
            s.pterodactyl_server_id = None;
            s.pterodactyl_server_uuid = None;
            s.pterodactyl_server_identifier = None;
            s.pterodactyl_internal_id = None;
            s.provision_status = ProvisionStatus::Unprovisioned;
        });
        Ok(())
    }

    async fn set_status(&self, id: i64, status: ServerStatus) -> Res<()> {
        self.update_server(id, |s| s.status = status);
        Ok(())
    }

    async fn set_subscription(
        &self,
        id: i64,
        subscription_id: &str,
        current_period_end: Option<NaiveDateTime>,
    ) -> Res<()> {
        self.update_server(id, |s| {
            s.stripe_subscription_id = Some(subscription_id.to_string());
            if current_period_end.is_some() {
                s.current_period_end = current_period_end;
            }
        });
        Ok(())
    }

    async fn set_checkout_session(&self, id: i64, session_id: &str) -> Res<()> {
        self.update_server(id, |s| {
            s.stripe_checkout_session_id = Some(session_id.to_string())
        });
        Ok(())
    }

    async fn set_billing_cycle(
        &self,
        id: i64,
        cycle: BillingCycle,
        pending: Option<BillingCycle>,
    ) -> Res<()> {
        self.update_server(id, |s| {
            s.billing_cycle = cycle;
            s.pending_billing_cycle = pending;
        });
        Ok(())
    }

    async fn set_cancel_at_period_end(&self, id: i64, cancel: bool) -> Res<()> {
        self.update_server(id, |s| s.cancel_at_period_end = cancel);
        Ok(())
    }

    async fn delete_server(&self, id: i64) -> Res<()> {
        self.state().servers.remove(&id);
        Ok(())
    }
}

impl UserStore for MemoryStore {
    async fn create_user(&self, data: UserCreateRequest) -> Res<User> {
        let mut state = self.state();
        if state.users.values().any(|u| u.email == data.email) {
            return Err(AppError::Conflict(format!("email {} is taken", data.email)));
        }
        let user = User {
            id: data.id.unwrap_or_else(Uuid::new_v4),
            email: data.email,
            first_name: data.first_name,
            last_name: data.last_name,
            is_admin: data.is_admin,
            stripe_customer_id: data.stripe_customer_id,
            pterodactyl_user_id: None,
            pterodactyl_user_uuid: None,
            address_line1: data.address.line1,
            address_line2: data.address.line2,
            city: data.address.city,
            postal_code: data.address.postal_code,
            country: data.address.country,
            created_at: now(),
            updated_at: now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Res<Option<User>> {
        Ok(self.user(id))
    }

    async fn find_user_by_email(&self, email: &str) -> Res<Option<User>> {
        Ok(self.state().users.values().find(|u| u.email == email).cloned())
    }

    async fn link_panel_account(
        &self,
        user_id: Uuid,
        panel_id: i64,
        panel_uuid: &str,
    ) -> Res<()> {
        self.update_user(user_id, |u| {
            u.pterodactyl_user_id = Some(panel_id);
            u.pterodactyl_user_uuid = Some(panel_uuid.to_string());
        });
        Ok(())
    }

    async fn set_stripe_customer(&self, user_id: Uuid, customer_id: &str) -> Res<()> {
        self.update_user(user_id, |u| u.stripe_customer_id = Some(customer_id.to_string()));
        Ok(())
    }
}
