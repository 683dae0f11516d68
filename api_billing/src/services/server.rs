use common::{
    billing::{BillingGateway, InvoiceSummary},
    error::{AppError, Res},
    jwt::JwtClaims,
    misc::{BillingCycle, ProvisionStatus, ServerStatus},
};
use db::{ServerStore, UserStore, models::server::Server};
use log::{info, warn};
use panel::PanelApi;
use provisioner::JobQueue;

use crate::Billing;

impl<S, P, Q, G> Billing<'_, S, P, Q, G>
where
    S: ServerStore + UserStore,
    P: PanelApi,
    Q: JobQueue,
    G: BillingGateway,
{
    pub async fn list_servers(&self, claims: &JwtClaims) -> Res<Vec<Server>> {
        self.store.list_servers_for_user(claims.user_id).await
    }

    /// Subscription id of a server. Uses the stored id when present,
    /// otherwise reads it from the checkout session and stores it.
    async fn subscription_of(&self, server: &Server) -> Res<String> {
        if let Some(id) = &server.stripe_subscription_id {
            return Ok(id.clone());
        }
        let session_id = server.stripe_checkout_session_id.as_deref().ok_or_else(|| {
            AppError::Conflict(format!("Server {} has no subscription", server.id))
        })?;
        let session = self.gateway.retrieve_checkout_session(session_id).await?;
        let subscription_id = session.subscription_id.ok_or_else(|| {
            AppError::Conflict(format!(
                "Checkout for server {} has not been completed",
                server.id
            ))
        })?;
        self.store
            .set_subscription(server.id, &subscription_id, None)
            .await?;
        Ok(subscription_id)
    }

    /// Schedules cancellation at the end of the paid period.
    pub async fn cancel(&self, claims: &JwtClaims, server_id: i64) -> Res<Server> {
        self.set_cancellation(claims, server_id, true).await
    }

    /// Undoes a scheduled cancellation.
    pub async fn resume(&self, claims: &JwtClaims, server_id: i64) -> Res<Server> {
        self.set_cancellation(claims, server_id, false).await
    }

    async fn set_cancellation(&self, claims: &JwtClaims, server_id: i64, cancel: bool) -> Res<Server> {
        let server = self.owned_server(claims, server_id).await?;
        if server.status == ServerStatus::Cancelled {
            return Err(AppError::Conflict(format!(
                "Server {} is already cancelled",
                server.id
            )));
        }
        let subscription_id = self.subscription_of(&server).await?;
        let snapshot = self
            .gateway
            .set_cancel_at_period_end(&subscription_id, cancel)
            .await?;
        self.store
            .set_subscription(server.id, &subscription_id, snapshot.current_period_end)
            .await?;
        self.store.set_cancel_at_period_end(server.id, cancel).await?;
        info!(
            "Server {} cancel_at_period_end={} (subscription {})",
            server.id, cancel, subscription_id
        );
        self.reload(server.id).await
    }

    /// Deletes a cancelled or never-paid server with its panel server.
    /// Admins may remove servers in any state.
    pub async fn remove(&self, claims: &JwtClaims, server_id: i64) -> Res<()> {
        let server = self.owned_server(claims, server_id).await?;
        let removable = matches!(server.status, ServerStatus::Cancelled | ServerStatus::Pending);
        if !removable && !claims.is_admin {
            return Err(AppError::Conflict(format!(
                "Server {} must be cancelled before it can be removed",
                server.id
            )));
        }

        if server.status != ServerStatus::Cancelled {
            self.cancel_before_removal(&server).await;
        }

        if let Some(panel_id) = server.pterodactyl_server_id {
            if let Err(e) = self.panel.suspend_server(panel_id).await {
                warn!("Could not suspend panel server {}: {}", panel_id, e);
            }
            match self.panel.delete_server(panel_id, true).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!("Could not delete panel server {}: {}", panel_id, e),
            }
        }

        self.store.delete_server(server.id).await?;
        info!("Removed server {} (by user {})", server.id, claims.user_id);
        Ok(())
    }

    /// Ends any live subscription of a server that is about to be deleted.
    /// A checkout completed before its webhook arrived still counts.
    async fn cancel_before_removal(&self, server: &Server) {
        let subscription_id = match self.subscription_of(server).await {
            Ok(id) => id,
            Err(AppError::Conflict(_)) => return,
            Err(e) => {
                warn!(
                    "Could not look up the subscription of server {}: {}",
                    server.id, e
                );
                return;
            }
        };
        if let Err(e) = self.gateway.cancel_subscription(&subscription_id).await {
            warn!(
                "Could not cancel subscription {} of server {}: {}",
                subscription_id, server.id, e
            );
        }
    }

    /// Schedules the subscription to move to the other cycle's price when
    /// the current period ends. The local cycle follows once Stripe reports
    /// the renewed subscription on the new interval.
    pub async fn switch_billing_cycle(
        &self,
        claims: &JwtClaims,
        server_id: i64,
        cycle: BillingCycle,
    ) -> Res<Server> {
        let server = self.owned_server(claims, server_id).await?;
        if server.status == ServerStatus::Cancelled {
            return Err(AppError::Conflict(format!(
                "Server {} is cancelled",
                server.id
            )));
        }
        let effective = server.pending_billing_cycle.unwrap_or(server.billing_cycle);
        if cycle == effective {
            return Err(AppError::BadRequest(format!(
                "Server {} is already billed {}",
                server.id, cycle
            )));
        }

        let price_id = self.catalog.price_for(&server.plan, cycle)?;
        let subscription_id = self.subscription_of(&server).await?;
        self.gateway
            .schedule_price_change(&subscription_id, price_id)
            .await?;

        // switching back before renewal just drops the pending change
        let pending = (cycle != server.billing_cycle).then_some(cycle);
        self.store
            .set_billing_cycle(server.id, server.billing_cycle, pending)
            .await?;
        info!(
            "Server {} switches to {} billing at renewal",
            server.id, cycle
        );
        self.reload(server.id).await
    }

    pub async fn list_invoices(&self, claims: &JwtClaims) -> Res<Vec<InvoiceSummary>> {
        let user = self
            .store
            .get_user(claims.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        match user.stripe_customer_id {
            Some(customer_id) => self.gateway.list_invoices(&customer_id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Clears a failed provisioning state and queues another run.
    pub async fn reprovision(&self, server_id: i64) -> Res<Server> {
        let server = self.reload(server_id).await?;
        if server.is_provisioned() {
            return Err(AppError::Conflict(format!(
                "Server {} is already provisioned",
                server.id
            )));
        }
        if server.status != ServerStatus::Active {
            return Err(AppError::Conflict(format!(
                "Server {} is {}, only active servers are provisioned",
                server.id, server.status
            )));
        }
        self.store
            .set_provision_status(server.id, ProvisionStatus::Unprovisioned, None)
            .await?;
        self.queue.enqueue_provision(server.id).await?;
        info!("Re-queued provisioning for server {}", server.id);
        self.reload(server.id).await
    }
}
