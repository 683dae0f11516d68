//! Client for the Pterodactyl panel Application API.
//!
//! Only the calls the provisioning job and the server lifecycle need are
//! covered: user lookup/creation, server lookup by external id, creation,
//! suspension and deletion.

use common::error::Res;

pub mod client;
pub mod dtos;

pub use client::PanelClient;
pub use dtos::{NewPanelServer, NewPanelUser, PanelServer, PanelUser};

#[allow(async_fn_in_trait)]
pub trait PanelApi {
    async fn find_user_by_email(&self, email: &str) -> Res<Option<PanelUser>>;
    async fn create_user(&self, user: &NewPanelUser) -> Res<PanelUser>;
    /// Returns `None` when the panel has no server with this external id.
    async fn find_server_by_external_id(&self, external_id: &str) -> Res<Option<PanelServer>>;
    async fn create_server(&self, server: &NewPanelServer) -> Res<PanelServer>;
    async fn suspend_server(&self, id: i64) -> Res<()>;
    async fn unsuspend_server(&self, id: i64) -> Res<()>;
    async fn delete_server(&self, id: i64, force: bool) -> Res<()>;
}
