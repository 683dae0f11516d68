use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use log::info;
use stripe::{
    CancelSubscription, CheckoutSession, CheckoutSessionId, CheckoutSessionMode, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems, CreateCustomer, Customer, CustomerId,
    Invoice, ListInvoices, Scheduled, Subscription, SubscriptionId, UpdateSubscription,
    generated::billing::subscription_schedule::{
        CreateSubscriptionSchedule, SubscriptionProrationBehavior as ScheduleProrationBehavior,
        SubscriptionSchedule, SubscriptionScheduleEndBehavior, UpdateSubscriptionSchedule,
        UpdateSubscriptionSchedulePhases, UpdateSubscriptionSchedulePhasesItems,
    },
};
use uuid::Uuid;

use crate::{
    billing::{
        BillingGateway, CheckoutRequest, CheckoutSnapshot, InvoiceSummary, SubscriptionSnapshot,
    },
    error::{AppError, Res},
};

pub fn create_client(secret_key: &str) -> Client {
    Client::new(secret_key)
}

/// Creates the Stripe customer that owns every subscription of one user.
/// The local user id is stored in the customer metadata for support lookups.
pub async fn create_customer(
    client: &Client,
    email: &str,
    name: &str,
    user_id: &str,
) -> Res<Customer> {
    let mut metadata = stripe::Metadata::new();
    metadata.insert("user_id".to_string(), user_id.to_string());

    let params = CreateCustomer {
        email: Some(email),
        name: Some(name),
        metadata: Some(metadata),
        ..Default::default()
    };

    Customer::create(client, params)
        .await
        .map_err(AppError::from)
}

pub fn customer_id(raw: &str) -> Res<CustomerId> {
    parse_id(raw, "customer")
}

pub fn subscription_id(raw: &str) -> Res<SubscriptionId> {
    parse_id(raw, "subscription")
}

pub fn checkout_session_id(raw: &str) -> Res<CheckoutSessionId> {
    parse_id(raw, "checkout session")
}

fn parse_id<T>(raw: &str, what: &str) -> Res<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| AppError::BadRequest(format!("Invalid {} id '{}': {}", what, raw, e)))
}

fn timestamp(ts: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.naive_utc())
}

/// Flattens a Stripe subscription into the fields mirrored locally.
pub fn subscription_snapshot(subscription: &Subscription) -> SubscriptionSnapshot {
    let price = subscription
        .items
        .data
        .first()
        .and_then(|item| item.price.as_ref());
    SubscriptionSnapshot {
        id: subscription.id.to_string(),
        status: subscription.status.as_str().to_string(),
        cancel_at_period_end: subscription.cancel_at_period_end,
        current_period_end: timestamp(subscription.current_period_end),
        price_id: price.map(|p| p.id.to_string()),
        interval: price
            .and_then(|p| p.recurring.as_ref())
            .map(|r| r.interval.as_str().to_string()),
    }
}

pub fn checkout_snapshot(session: &CheckoutSession) -> CheckoutSnapshot {
    CheckoutSnapshot {
        id: session.id.to_string(),
        url: session.url.clone(),
        client_reference_id: session.client_reference_id.clone(),
        subscription_id: session.subscription.as_ref().map(|s| s.id().to_string()),
    }
}

fn phase_item(price_id: &str) -> UpdateSubscriptionSchedulePhasesItems {
    UpdateSubscriptionSchedulePhasesItems {
        price: Some(price_id.to_string()),
        quantity: Some(1),
        ..Default::default()
    }
}

fn invoice_summary(invoice: &Invoice) -> InvoiceSummary {
    InvoiceSummary {
        id: invoice.id.to_string(),
        number: invoice.number.clone(),
        status: invoice.status.map(|s| s.as_str().to_string()),
        currency: invoice.currency.map(|c| c.to_string()),
        amount_due: invoice.amount_due,
        amount_paid: invoice.amount_paid,
        hosted_invoice_url: invoice.hosted_invoice_url.clone(),
        subscription_id: invoice.subscription.as_ref().map(|s| s.id().to_string()),
        created: invoice.created,
    }
}

/// [`BillingGateway`] backed by the Stripe API.
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
}

impl StripeGateway {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: create_client(secret_key),
        }
    }
}

impl BillingGateway for StripeGateway {
    async fn create_customer(&self, email: &str, name: &str, user_id: Uuid) -> Res<String> {
        let customer = create_customer(&self.client, email, name, &user_id.to_string()).await?;
        info!("Created Stripe customer {} for user {}", customer.id, user_id);
        Ok(customer.id.to_string())
    }

    async fn create_checkout_session(&self, req: &CheckoutRequest<'_>) -> Res<CheckoutSnapshot> {
        let server_id = req.server_id.to_string();
        let mut metadata = stripe::Metadata::new();
        metadata.insert("server_id".to_string(), server_id.clone());

        let params = CreateCheckoutSession {
            line_items: Some(vec![CreateCheckoutSessionLineItems {
                price: Some(req.price_id.to_string()),
                quantity: Some(1),
                ..Default::default()
            }]),
            mode: Some(CheckoutSessionMode::Subscription),
            success_url: Some(req.success_url),
            cancel_url: Some(req.cancel_url),
            customer: Some(customer_id(req.customer_id)?),
            client_reference_id: Some(&server_id),
            metadata: Some(metadata),
            ..Default::default()
        };
        let session = CheckoutSession::create(&self.client, params).await?;
        Ok(checkout_snapshot(&session))
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Res<CheckoutSnapshot> {
        let id = checkout_session_id(session_id)?;
        let session = CheckoutSession::retrieve(&self.client, &id, &[]).await?;
        Ok(checkout_snapshot(&session))
    }

    async fn retrieve_subscription(&self, id: &str) -> Res<SubscriptionSnapshot> {
        let id = subscription_id(id)?;
        let subscription = Subscription::retrieve(&self.client, &id, &[]).await?;
        Ok(subscription_snapshot(&subscription))
    }

    async fn set_cancel_at_period_end(&self, id: &str, cancel: bool) -> Res<SubscriptionSnapshot> {
        let id = subscription_id(id)?;
        let params = UpdateSubscription {
            cancel_at_period_end: Some(cancel),
            ..Default::default()
        };
        let subscription = Subscription::update(&self.client, &id, params).await?;
        Ok(subscription_snapshot(&subscription))
    }

    async fn cancel_subscription(&self, id: &str) -> Res<()> {
        let id = subscription_id(id)?;
        Subscription::cancel(&self.client, &id, CancelSubscription::new()).await?;
        Ok(())
    }

    async fn schedule_price_change(&self, id: &str, price_id: &str) -> Res<SubscriptionSnapshot> {
        let sub_id = subscription_id(id)?;
        let subscription = Subscription::retrieve(&self.client, &sub_id, &[]).await?;
        let current_price = subscription
            .items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|p| p.id.to_string())
            .ok_or_else(|| {
                AppError::Internal(format!("subscription {} has no priced items", subscription.id))
            })?;

        let schedule = match &subscription.schedule {
            Some(existing) => {
                SubscriptionSchedule::retrieve(&self.client, &existing.id(), &[]).await?
            }
            None => {
                let params = CreateSubscriptionSchedule {
                    from_subscription: Some(id),
                    ..Default::default()
                };
                SubscriptionSchedule::create(&self.client, params).await?
            }
        };

        // The running phase keeps its dates so nothing is billed before renewal.
        let (start, end) = match &schedule.current_phase {
            Some(phase) => (phase.start_date, phase.end_date),
            None => (
                subscription.current_period_start,
                subscription.current_period_end,
            ),
        };
        let params = UpdateSubscriptionSchedule {
            end_behavior: Some(SubscriptionScheduleEndBehavior::Release),
            proration_behavior: Some(ScheduleProrationBehavior::None),
            phases: Some(vec![
                UpdateSubscriptionSchedulePhases {
                    items: vec![phase_item(&current_price)],
                    start_date: Some(Scheduled::at(start)),
                    end_date: Some(Scheduled::at(end)),
                    ..Default::default()
                },
                UpdateSubscriptionSchedulePhases {
                    items: vec![phase_item(price_id)],
                    iterations: Some(1),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        SubscriptionSchedule::update(&self.client, &schedule.id, params).await?;
        info!(
            "Scheduled subscription {} to move to price {} at {}",
            subscription.id, price_id, end
        );
        Ok(subscription_snapshot(&subscription))
    }

    async fn list_invoices(&self, customer: &str) -> Res<Vec<InvoiceSummary>> {
        let params = ListInvoices {
            customer: Some(customer_id(customer)?),
            limit: Some(100),
            ..Default::default()
        };
        let invoices = Invoice::list(&self.client, &params).await?;
        Ok(invoices.data.iter().map(invoice_summary).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_ids() {
        assert!(subscription_id("sub_123").is_ok());
        assert!(checkout_session_id("cs_test_123").is_ok());
        assert!(customer_id("cus_123").is_ok());
    }

    #[test]
    fn rejects_ids_with_wrong_prefix() {
        assert!(matches!(
            subscription_id("cus_123"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn schedule_phase_items_hold_one_unit_of_the_price() {
        let item = phase_item("price_yearly");
        assert_eq!(item.price.as_deref(), Some("price_yearly"));
        assert_eq!(item.quantity, Some(1));
        assert!(item.plan.is_none());
    }

    #[test]
    fn converts_unix_timestamps() {
        let ts = timestamp(1_740_830_400).unwrap();
        assert_eq!(ts.to_string(), "2025-03-01 12:00:00");
    }
}
