use common::{
    billing::{BillingGateway, SubscriptionSnapshot},
    error::{AppError, Res},
    misc::{ProvisionStatus, ServerStatus},
    stripe::{checkout_snapshot, subscription_snapshot},
};
use db::{ServerStore, UserStore, models::server::Server};
use log::{info, warn};
use panel::PanelApi;
use provisioner::JobQueue;
use stripe::{Event, EventObject, EventType, Webhook};

use crate::Billing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionChange {
    Created,
    Updated,
    Deleted,
}

/// The Stripe events the service reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutCompleted {
        session_id: String,
        server_id: Option<i64>,
        subscription_id: Option<String>,
    },
    SubscriptionChanged {
        kind: SubscriptionChange,
        snapshot: SubscriptionSnapshot,
    },
    InvoicePaid {
        subscription_id: String,
    },
    Ignored(String),
}

/// Creates an event for the webhook based on the request payload and signature.
/// Requires a webhook secret key.
pub fn construct_event(payload: &str, signature: &str, webhook_secret: &str) -> Res<Event> {
    match Webhook::construct_event(payload, signature, webhook_secret) {
        Ok(event) => Ok(event),
        Err(e) => {
            log::error!("Error constructing webhook event: {}", e);
            Err(AppError::BadRequest(format!("Webhook Error: {}", e)))
        }
    }
}

pub fn translate(event: Event) -> BillingEvent {
    let changed = |kind, subscription: &stripe::Subscription| BillingEvent::SubscriptionChanged {
        kind,
        snapshot: subscription_snapshot(subscription),
    };

    match (event.type_, event.data.object) {
        (EventType::CheckoutSessionCompleted, EventObject::CheckoutSession(session)) => {
            let session = checkout_snapshot(&session);
            BillingEvent::CheckoutCompleted {
                server_id: session
                    .client_reference_id
                    .as_deref()
                    .and_then(|id| id.parse().ok()),
                subscription_id: session.subscription_id,
                session_id: session.id,
            }
        }
        (EventType::CustomerSubscriptionCreated, EventObject::Subscription(subscription)) => {
            changed(SubscriptionChange::Created, &subscription)
        }
        (EventType::CustomerSubscriptionUpdated, EventObject::Subscription(subscription)) => {
            changed(SubscriptionChange::Updated, &subscription)
        }
        (EventType::CustomerSubscriptionDeleted, EventObject::Subscription(subscription)) => {
            changed(SubscriptionChange::Deleted, &subscription)
        }
        (
            kind @ (EventType::InvoicePaid | EventType::InvoicePaymentSucceeded),
            EventObject::Invoice(invoice),
        ) => match invoice.subscription.as_ref() {
            Some(subscription) => BillingEvent::InvoicePaid {
                subscription_id: subscription.id().to_string(),
            },
            None => BillingEvent::Ignored(kind.to_string()),
        },
        (other, _) => BillingEvent::Ignored(other.to_string()),
    }
}

/// Maps a Stripe subscription status onto the server lifecycle.
/// `None` means the status does not change the server.
pub fn map_subscription_status(status: &str) -> Option<ServerStatus> {
    match status {
        "active" => Some(ServerStatus::Active),
        "canceled" | "incomplete_expired" => Some(ServerStatus::Cancelled),
        "past_due" | "unpaid" => Some(ServerStatus::Suspended),
        _ => None,
    }
}

impl<S, P, Q, G> Billing<'_, S, P, Q, G>
where
    S: ServerStore + UserStore,
    P: PanelApi,
    Q: JobQueue,
    G: BillingGateway,
{
    pub async fn handle_event(&self, event: BillingEvent) -> Res<()> {
        match event {
            BillingEvent::CheckoutCompleted {
                session_id,
                server_id,
                subscription_id,
            } => {
                self.on_checkout_completed(&session_id, server_id, subscription_id)
                    .await
            }
            BillingEvent::SubscriptionChanged { kind, snapshot } => {
                self.on_subscription_changed(kind, &snapshot).await
            }
            BillingEvent::InvoicePaid { subscription_id } => {
                self.on_invoice_paid(&subscription_id).await
            }
            BillingEvent::Ignored(kind) => {
                log::info!("Unhandled event type: {}", kind);
                Ok(())
            }
        }
    }

    async fn on_checkout_completed(
        &self,
        session_id: &str,
        server_id: Option<i64>,
        subscription_id: Option<String>,
    ) -> Res<()> {
        let Some(server_id) = server_id else {
            warn!("Checkout session {} has no server reference", session_id);
            return Ok(());
        };
        let Some(server) = self.store.get_server(server_id).await? else {
            warn!(
                "Checkout session {} references unknown server {}",
                session_id, server_id
            );
            return Ok(());
        };
        let Some(subscription_id) = subscription_id else {
            info!("Checkout session {} completed without a subscription", session_id);
            return Ok(());
        };

        info!(
            "Checkout session {} completed: server {} -> subscription {}",
            session_id, server.id, subscription_id
        );
        self.store.set_checkout_session(server.id, session_id).await?;
        self.store
            .set_subscription(server.id, &subscription_id, None)
            .await?;

        // subscription events may have arrived before the id was known
        let snapshot = self.gateway.retrieve_subscription(&subscription_id).await?;
        self.apply_subscription_state(&server, &snapshot, false)
            .await?;
        Ok(())
    }

    async fn on_subscription_changed(
        &self,
        kind: SubscriptionChange,
        snapshot: &SubscriptionSnapshot,
    ) -> Res<()> {
        let Some(server) = self.store.find_by_subscription(&snapshot.id).await? else {
            info!(
                "Subscription {} ({:?}) does not belong to any server",
                snapshot.id, kind
            );
            return Ok(());
        };

        if kind == SubscriptionChange::Updated {
            self.promote_pending_cycle(&server, snapshot).await?;
        }
        self.apply_subscription_state(&server, snapshot, kind == SubscriptionChange::Deleted)
            .await?;
        Ok(())
    }

    async fn on_invoice_paid(&self, subscription_id: &str) -> Res<()> {
        let Some(server) = self.store.find_by_subscription(subscription_id).await? else {
            info!("Paid invoice for unknown subscription {}", subscription_id);
            return Ok(());
        };
        let snapshot = self.gateway.retrieve_subscription(subscription_id).await?;
        self.apply_subscription_state(&server, &snapshot, false)
            .await?;
        Ok(())
    }

    async fn promote_pending_cycle(
        &self,
        server: &Server,
        snapshot: &SubscriptionSnapshot,
    ) -> Res<()> {
        let Some(pending) = server.pending_billing_cycle else {
            return Ok(());
        };
        // prices without a recurring interval on the event resolve through the catalog
        let cycle = snapshot.billing_cycle().or_else(|| {
            snapshot
                .price_id
                .as_deref()
                .and_then(|price| self.catalog.plan_for_price(price))
                .map(|(_, cycle)| cycle)
        });
        let promote = match cycle {
            Some(cycle) => cycle == pending,
            None => snapshot.interval.is_none(),
        };
        if promote {
            info!(
                "Server {} billing cycle {} -> {}",
                server.id, server.billing_cycle, pending
            );
            self.store.set_billing_cycle(server.id, pending, None).await?;
        }
        Ok(())
    }

    /// Mirrors a subscription onto its server and applies the resulting
    /// status: panel suspension on `suspended`/`cancelled`, unsuspension when
    /// returning to `active`, and a provisioning job when an active server has
    /// no panel server yet. Returns the server status after the update.
    pub async fn apply_subscription_state(
        &self,
        server: &Server,
        snapshot: &SubscriptionSnapshot,
        deleted: bool,
    ) -> Res<ServerStatus> {
        self.store
            .set_subscription(server.id, &snapshot.id, snapshot.current_period_end)
            .await?;
        if snapshot.cancel_at_period_end != server.cancel_at_period_end {
            self.store
                .set_cancel_at_period_end(server.id, snapshot.cancel_at_period_end)
                .await?;
        }

        let target = if deleted {
            Some(ServerStatus::Cancelled)
        } else {
            map_subscription_status(&snapshot.status)
        };
        let Some(target) = target else {
            info!(
                "Subscription {} status '{}' leaves server {} {}",
                snapshot.id, snapshot.status, server.id, server.status
            );
            return Ok(server.status);
        };

        if target != server.status {
            info!(
                "Server {} status {} -> {} (subscription {} is '{}')",
                server.id, server.status, target, snapshot.id, snapshot.status
            );
            self.store.set_status(server.id, target).await?;
            self.panel_side_effects(server, target).await;
        }

        if target == ServerStatus::Active && self.needs_provisioning(server) {
            self.queue.enqueue_provision(server.id).await?;
        }
        Ok(target)
    }

    fn needs_provisioning(&self, server: &Server) -> bool {
        if server.is_provisioned() {
            return false;
        }
        // failed runs are retried by an admin, not by repeated billing events
        server.status != ServerStatus::Active
            || server.provision_status == ProvisionStatus::Unprovisioned
    }

    async fn panel_side_effects(&self, server: &Server, target: ServerStatus) {
        let Some(panel_id) = server.pterodactyl_server_id else {
            return;
        };
        let result = match (server.status, target) {
            (_, ServerStatus::Suspended | ServerStatus::Cancelled) => {
                self.panel.suspend_server(panel_id).await
            }
            (ServerStatus::Suspended, ServerStatus::Active) => {
                self.panel.unsuspend_server(panel_id).await
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!(
                "Panel update for server {} ({} -> {}) failed: {}",
                server.id, server.status, target, e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_table() {
        let cases = [
            ("active", Some(ServerStatus::Active)),
            ("canceled", Some(ServerStatus::Cancelled)),
            ("incomplete_expired", Some(ServerStatus::Cancelled)),
            ("past_due", Some(ServerStatus::Suspended)),
            ("unpaid", Some(ServerStatus::Suspended)),
            ("trialing", None),
            ("incomplete", None),
            ("paused", None),
        ];
        for (status, expected) in cases {
            assert_eq!(map_subscription_status(status), expected, "{status}");
        }
    }
}
