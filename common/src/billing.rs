//! Payment provider seam.
//!
//! Billing flows talk to Stripe through [`BillingGateway`] and only see these
//! plain snapshots, so webhook handling and server lifecycle code can be
//! exercised without the network.

use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::{error::Res, misc::BillingCycle};

/// The parts of a subscription the service mirrors locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    pub id: String,
    /// Provider status string, e.g. `active`, `past_due`, `canceled`.
    pub status: String,
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<NaiveDateTime>,
    pub price_id: Option<String>,
    /// Recurring interval of the first item's price (`month`, `year`).
    pub interval: Option<String>,
}

impl SubscriptionSnapshot {
    pub fn billing_cycle(&self) -> Option<BillingCycle> {
        self.interval.as_deref().and_then(BillingCycle::from_interval)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSnapshot {
    pub id: String,
    pub url: Option<String>,
    pub client_reference_id: Option<String>,
    pub subscription_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceSummary {
    pub id: String,
    pub number: Option<String>,
    pub status: Option<String>,
    pub currency: Option<String>,
    pub amount_due: Option<i64>,
    pub amount_paid: Option<i64>,
    pub hosted_invoice_url: Option<String>,
    pub subscription_id: Option<String>,
    pub created: Option<i64>,
}

/// Parameters of a subscription-mode checkout for one server.
#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    pub customer_id: &'a str,
    pub price_id: &'a str,
    pub server_id: i64,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
}

#[allow(async_fn_in_trait)]
pub trait BillingGateway {
    /// Creates a customer and returns its id.
    async fn create_customer(&self, email: &str, name: &str, user_id: Uuid) -> Res<String>;
    async fn create_checkout_session(&self, req: &CheckoutRequest<'_>) -> Res<CheckoutSnapshot>;
    async fn retrieve_checkout_session(&self, session_id: &str) -> Res<CheckoutSnapshot>;
    async fn retrieve_subscription(&self, subscription_id: &str) -> Res<SubscriptionSnapshot>;
    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Res<SubscriptionSnapshot>;
    /// Cancels immediately.
    async fn cancel_subscription(&self, subscription_id: &str) -> Res<()>;
    /// Schedules the subscription to move to another price when the current
    /// period ends. The returned snapshot still carries the current price.
    async fn schedule_price_change(
        &self,
        subscription_id: &str,
        price_id: &str,
    ) -> Res<SubscriptionSnapshot>;
    async fn list_invoices(&self, customer_id: &str) -> Res<Vec<InvoiceSummary>>;
}
