//! Storage seams used by the provisioning job and the billing services.
//!
//! Orchestration code takes these traits as generic parameters so it runs the
//! same against Postgres in production and the in-memory store in tests.

use std::sync::Arc;

use chrono::NaiveDateTime;
use common::{
    error::Res,
    misc::{BillingCycle, ProvisionStatus, ServerStatus},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    dtos::{server::ServerCreateRequest, user::UserCreateRequest},
    models::{
        server::{PanelServerIds, Server},
        user::User,
    },
    server, user,
};

#[allow(async_fn_in_trait)]
pub trait ServerStore {
    async fn create_server(&self, data: ServerCreateRequest) -> Res<Server>;
    async fn get_server(&self, id: i64) -> Res<Option<Server>>;
    async fn find_by_subscription(&self, subscription_id: &str) -> Res<Option<Server>>;
    async fn list_servers_for_user(&self, user_id: Uuid) -> Res<Vec<Server>>;
    async fn list_servers(&self) -> Res<Vec<Server>>;
    async fn set_provision_status(
        &self,
        id: i64,
        status: ProvisionStatus,
        error: Option<&str>,
    ) -> Res<()>;
    async fn set_external_id(&self, id: i64, external_id: &str) -> Res<()>;
    async fn attach_panel_server(&self, id: i64, panel: &PanelServerIds) -> Res<()>;
    async fn detach_panel_server(&self, id: i64) -> Res<()>;
    async fn set_status(&self, id: i64, status: ServerStatus) -> Res<()>;
    async fn set_subscription(
        &self,
        id: i64,
        subscription_id: &str,
        current_period_end: Option<NaiveDateTime>,
    ) -> Res<()>;
    async fn set_checkout_session(&self, id: i64, session_id: &str) -> Res<()>;
    async fn set_billing_cycle(
        &self,
        id: i64,
        cycle: BillingCycle,
        pending: Option<BillingCycle>,
    ) -> Res<()>;
    async fn set_cancel_at_period_end(&self, id: i64, cancel: bool) -> Res<()>;
    async fn delete_server(&self, id: i64) -> Res<()>;
}

#[allow(async_fn_in_trait)]
pub trait UserStore {
    async fn create_user(&self, data: UserCreateRequest) -> Res<User>;
    async fn get_user(&self, id: Uuid) -> Res<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Res<Option<User>>;
    async fn link_panel_account(&self, user_id: Uuid, panel_id: i64, panel_uuid: &str)
    -> Res<()>;
    async fn set_stripe_customer(&self, user_id: Uuid, customer_id: &str) -> Res<()>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl ServerStore for PgStore {
    async fn create_server(&self, data: ServerCreateRequest) -> Res<Server> {
        let mut tx = self.pool.begin().await?;
        let created = server::insert_server(&mut *tx, data).await?;
        let created = server::set_subscription_name(
            &mut *tx,
            created.id,
            &format!("server_{}", created.id),
        )
        .await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn get_server(&self, id: i64) -> Res<Option<Server>> {
        server::get_server(self.pool(), id).await
    }

    async fn find_by_subscription(&self, subscription_id: &str) -> Res<Option<Server>> {
        server::get_server_by_subscription(self.pool(), subscription_id).await
    }

    async fn list_servers_for_user(&self, user_id: Uuid) -> Res<Vec<Server>> {
        server::list_servers_by_user(self.pool(), user_id).await
    }

    async fn list_servers(&self) -> Res<Vec<Server>> {
        server::list_servers(self.pool()).await
    }

    async fn set_provision_status(
        &self,
        id: i64,
        status: ProvisionStatus,
        error: Option<&str>,
    ) -> Res<()> {
        server::update_provision_status(self.pool(), id, status, error).await
    }

    async fn set_external_id(&self, id: i64, external_id: &str) -> Res<()> {
        server::update_external_id(self.pool(), id, external_id).await
    }

    async fn attach_panel_server(&self, id: i64, panel: &PanelServerIds) -> Res<()> {
        server::attach_panel_server(self.pool(), id, panel).await
    }

    async fn detach_panel_server(&self, id: i64) -> Res<()> {
        server::detach_panel_server(self.pool(), id).await
    }

    async fn set_status(&self, id: i64, status: ServerStatus) -> Res<()> {
        server::update_status(self.pool(), id, status).await
    }

    async fn set_subscription(
        &self,
        id: i64,
        subscription_id: &str,
        current_period_end: Option<NaiveDateTime>,
    ) -> Res<()> {
        server::update_subscription(self.pool(), id, subscription_id, current_period_end).await
    }

    async fn set_checkout_session(&self, id: i64, session_id: &str) -> Res<()> {
        server::update_checkout_session(self.pool(), id, session_id).await
    }

    async fn set_billing_cycle(
        &self,
        id: i64,
        cycle: BillingCycle,
        pending: Option<BillingCycle>,
    ) -> Res<()> {
        server::update_billing_cycle(self.pool(), id, cycle, pending).await
    }

    async fn set_cancel_at_period_end(&self, id: i64, cancel: bool) -> Res<()> {
        server::update_cancel_at_period_end(self.pool(), id, cancel).await
    }

    async fn delete_server(&self, id: i64) -> Res<()> {
        server::delete_server(self.pool(), id).await
    }
}

impl UserStore for PgStore {
    async fn create_user(&self, data: UserCreateRequest) -> Res<User> {
        user::insert_user(self.pool(), data).await
    }

    async fn get_user(&self, id: Uuid) -> Res<Option<User>> {
        user::get_user_by_id(self.pool(), id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Res<Option<User>> {
        user::get_user_by_email(self.pool(), email).await
    }

    async fn link_panel_account(
        &self,
        user_id: Uuid,
        panel_id: i64,
        panel_uuid: &str,
    ) -> Res<()> {
        user::update_panel_account(self.pool(), user_id, panel_id, panel_uuid).await
    }

    async fn set_stripe_customer(&self, user_id: Uuid, customer_id: &str) -> Res<()> {
        user::update_stripe_customer(self.pool(), user_id, customer_id).await
    }
}
