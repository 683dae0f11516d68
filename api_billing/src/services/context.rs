use common::{
    catalog::Catalog,
    error::{AppError, Res},
    jwt::JwtClaims,
};
use db::{ServerStore, models::server::Server};

/// Borrowed dependencies of the billing flows. Each flow lives in its own
/// `impl` block (checkout, webhook, server lifecycle).
pub struct Billing<'a, S, P, Q, G> {
    pub store: &'a S,
    pub panel: &'a P,
    pub queue: &'a Q,
    pub gateway: &'a G,
    pub catalog: &'a Catalog,
}

/// Non-admins may only act on their own servers.
pub fn ensure_owner(claims: &JwtClaims, server: &Server) -> Res<()> {
    if claims.is_admin || server.user_id == claims.user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Server {} does not belong to you",
            server.id
        )))
    }
}

impl<S: ServerStore, P, Q, G> Billing<'_, S, P, Q, G> {
    /// Loads a server the caller is allowed to manage.
    pub async fn owned_server(&self, claims: &JwtClaims, server_id: i64) -> Res<Server> {
        let server = self.reload(server_id).await?;
        ensure_owner(claims, &server)?;
        Ok(server)
    }

    pub(crate) async fn reload(&self, server_id: i64) -> Res<Server> {
        self.store
            .get_server(server_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Server {} not found", server_id)))
    }
}
