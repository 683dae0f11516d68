use common::{
    billing::{BillingGateway, CheckoutRequest},
    error::{AppError, Res},
    jwt::JwtClaims,
};
use db::{ServerStore, UserStore, dtos::server::ServerCreateRequest, models::server::Server};
use log::info;
use panel::PanelApi;
use provisioner::JobQueue;

use crate::{
    Billing,
    dtos::checkout::{CheckoutCreateRequest, CheckoutResponse},
};

const MAX_NAME_LEN: usize = 64;

fn validate_name(name: &str) -> Res<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Server name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Server name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

/// Catalog misses caused by client input are the client's fault.
fn selection_error(err: AppError) -> AppError {
    match err {
        AppError::Config(message) => AppError::BadRequest(message),
        other => other,
    }
}

impl<S, P, Q, G> Billing<'_, S, P, Q, G>
where
    S: ServerStore + UserStore,
    P: PanelApi,
    Q: JobQueue,
    G: BillingGateway,
{
    /// Creates a pending server and a subscription checkout for it.
    pub async fn start_checkout(
        &self,
        claims: &JwtClaims,
        req: CheckoutCreateRequest,
        app_url: &str,
    ) -> Res<CheckoutResponse> {
        let name = validate_name(&req.name)?;
        self.catalog
            .validate_selection(&req.plan, &req.game, &req.variant, &req.region, req.billing_cycle)
            .map_err(selection_error)?;
        let price_id = self
            .catalog
            .price_for(&req.plan, req.billing_cycle)
            .map_err(selection_error)?;

        let user = self
            .store
            .get_user(claims.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let server = self
            .store
            .create_server(ServerCreateRequest {
                user_id: user.id,
                name,
                plan: req.plan,
                game: req.game,
                variant: req.variant,
                region: req.region,
                billing_cycle: req.billing_cycle,
            })
            .await?;

        let customer_id = match user.stripe_customer_id.clone() {
            Some(id) => id,
            None => {
                let id = self
                    .gateway
                    .create_customer(&user.email, &user.full_name(), user.id)
                    .await?;
                self.store.set_stripe_customer(user.id, &id).await?;
                id
            }
        };

        let success_url = format!("{}/dashboard/servers/{}?checkout=success", app_url, server.id);
        let cancel_url = format!("{}/dashboard/servers/{}?checkout=cancelled", app_url, server.id);
        let session = self
            .gateway
            .create_checkout_session(&CheckoutRequest {
                customer_id: &customer_id,
                price_id,
                server_id: server.id,
                success_url: &success_url,
                cancel_url: &cancel_url,
            })
            .await?;
        self.store.set_checkout_session(server.id, &session.id).await?;

        let url = session.url.ok_or_else(|| {
            AppError::Internal(format!("Checkout session {} has no URL", session.id))
        })?;
        info!(
            "Started checkout {} for server {} (user {})",
            session.id, server.id, user.id
        );
        Ok(CheckoutResponse {
            server_id: server.id,
            session_id: session.id,
            url,
        })
    }

    /// Called when the browser returns from checkout. The webhook normally
    /// got there first; otherwise the session is read back from Stripe.
    pub async fn complete_checkout(&self, claims: &JwtClaims, server_id: i64) -> Res<Server> {
        let server = self.owned_server(claims, server_id).await?;
        if server.stripe_subscription_id.is_some() {
            return Ok(server);
        }

        let session_id = server.stripe_checkout_session_id.clone().ok_or_else(|| {
            AppError::BadRequest(format!("Server {} has no checkout session", server.id))
        })?;
        let session = self.gateway.retrieve_checkout_session(&session_id).await?;
        let Some(subscription_id) = session.subscription_id else {
            info!(
                "Checkout {} for server {} has no subscription yet",
                session_id, server.id
            );
            return Ok(server);
        };

        let snapshot = self.gateway.retrieve_subscription(&subscription_id).await?;
        self.apply_subscription_state(&server, &snapshot, false)
            .await?;
        self.reload(server.id).await
    }
}
