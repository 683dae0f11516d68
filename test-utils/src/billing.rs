use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use common::{
    billing::{
        BillingGateway, CheckoutRequest, CheckoutSnapshot, InvoiceSummary, SubscriptionSnapshot,
    },
    error::{AppError, Res},
};
use uuid::Uuid;

use crate::factory::{MONTHLY_PRICE, YEARLY_PRICE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingCall {
    CreateCustomer(String),
    CreateCheckout {
        customer_id: String,
        price_id: String,
        server_id: i64,
    },
    RetrieveCheckout(String),
    RetrieveSubscription(String),
    SetCancelAtPeriodEnd { id: String, cancel: bool },
    Cancel(String),
    SchedulePriceChange { id: String, price_id: String },
    ListInvoices(String),
}

struct State {
    calls: Vec<BillingCall>,
    subscriptions: HashMap<String, SubscriptionSnapshot>,
    sessions: HashMap<String, CheckoutSnapshot>,
    invoices: Vec<(String, InvoiceSummary)>,
    intervals: HashMap<String, String>,
    scheduled: HashMap<String, String>,
    next_id: u32,
}

/// `BillingGateway` double with scripted subscriptions and checkout sessions.
#[derive(Clone)]
pub struct FakeBilling {
    state: Arc<Mutex<State>>,
}

impl Default for FakeBilling {
    fn default() -> Self {
        let intervals = HashMap::from([
            (MONTHLY_PRICE.to_string(), "month".to_string()),
            (YEARLY_PRICE.to_string(), "year".to_string()),
        ]);
        Self {
            state: Arc::new(Mutex::new(State {
                calls: Vec::new(),
                subscriptions: HashMap::new(),
                sessions: HashMap::new(),
                invoices: Vec::new(),
                intervals,
                scheduled: HashMap::new(),
                next_id: 0,
            })),
        }
    }
}

/// A monthly `power` subscription in the given status.
pub fn subscription(id: &str, status: &str) -> SubscriptionSnapshot {
    SubscriptionSnapshot {
        id: id.to_string(),
        status: status.to_string(),
        cancel_at_period_end: false,
        current_period_end: None,
        price_id: Some(MONTHLY_PRICE.to_string()),
        interval: Some("month".to_string()),
    }
}

impl FakeBilling {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("billing mutex poisoned")
    }

    fn record(&self, call: BillingCall) {
        self.state().calls.push(call);
    }

    pub fn calls(&self) -> Vec<BillingCall> {
        self.state().calls.clone()
    }

    pub fn with_subscription(&self, snapshot: SubscriptionSnapshot) {
        self.state()
            .subscriptions
            .insert(snapshot.id.clone(), snapshot);
    }

    pub fn subscription(&self, id: &str) -> Option<SubscriptionSnapshot> {
        self.state().subscriptions.get(id).cloned()
    }

    pub fn with_session(&self, session: CheckoutSnapshot) {
        self.state().sessions.insert(session.id.clone(), session);
    }

    /// Simulates the customer paying: the session now carries the subscription.
    pub fn complete_session(&self, session_id: &str, subscription_id: &str) {
        if let Some(session) = self.state().sessions.get_mut(session_id) {
            session.subscription_id = Some(subscription_id.to_string());
        }
    }

    pub fn with_invoice(&self, customer_id: &str, invoice: InvoiceSummary) {
        self.state()
            .invoices
            .push((customer_id.to_string(), invoice));
    }

    pub fn scheduled_price(&self, id: &str) -> Option<String> {
        self.state().scheduled.get(id).cloned()
    }

    /// Simulates the period rolling over: a scheduled price takes effect.
    pub fn renew(&self, id: &str) -> Res<SubscriptionSnapshot> {
        let next = self.state().scheduled.remove(id);
        self.update_subscription(id, |s, intervals| {
            if let Some(price_id) = next {
                s.interval = intervals.get(&price_id).cloned();
                s.price_id = Some(price_id);
            }
        })
    }

    fn update_subscription(
        &self,
        id: &str,
        apply: impl FnOnce(&mut SubscriptionSnapshot, &HashMap<String, String>),
    ) -> Res<SubscriptionSnapshot> {
        let mut state = self.state();
        let State {
            subscriptions,
            intervals,
            ..
        } = &mut *state;
        let snapshot = subscriptions
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("No such subscription: '{}'", id)))?;
        apply(snapshot, intervals);
        Ok(snapshot.clone())
    }
}

impl BillingGateway for FakeBilling {
    async fn create_customer(&self, email: &str, _name: &str, _user_id: Uuid) -> Res<String> {
        self.record(BillingCall::CreateCustomer(email.to_string()));
        let mut state = self.state();
        state.next_id += 1;
        Ok(format!("cus_test{}", state.next_id))
    }

    async fn create_checkout_session(&self, req: &CheckoutRequest<'_>) -> Res<CheckoutSnapshot> {
        self.record(BillingCall::CreateCheckout {
            customer_id: req.customer_id.to_string(),
            price_id: req.price_id.to_string(),
            server_id: req.server_id,
        });
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("cs_test_{}", state.next_id);
        let session = CheckoutSnapshot {
            id: id.clone(),
            url: Some(format!("https://checkout.stripe.test/{}", id)),
            client_reference_id: Some(req.server_id.to_string()),
            subscription_id: None,
        };
        state.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Res<CheckoutSnapshot> {
        self.record(BillingCall::RetrieveCheckout(session_id.to_string()));
        self.state()
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No such checkout session: '{}'", session_id)))
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Res<SubscriptionSnapshot> {
        self.record(BillingCall::RetrieveSubscription(subscription_id.to_string()));
        self.update_subscription(subscription_id, |_, _| {})
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Res<SubscriptionSnapshot> {
        self.record(BillingCall::SetCancelAtPeriodEnd {
            id: subscription_id.to_string(),
            cancel,
        });
        self.update_subscription(subscription_id, |s, _| s.cancel_at_period_end = cancel)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Res<()> {
        self.record(BillingCall::Cancel(subscription_id.to_string()));
        self.update_subscription(subscription_id, |s, _| s.status = "canceled".to_string())?;
        Ok(())
    }

    async fn schedule_price_change(
        &self,
        subscription_id: &str,
        price_id: &str,
    ) -> Res<SubscriptionSnapshot> {
        self.record(BillingCall::SchedulePriceChange {
            id: subscription_id.to_string(),
            price_id: price_id.to_string(),
        });
        let snapshot = self.update_subscription(subscription_id, |_, _| {})?;
        self.state()
            .scheduled
            .insert(subscription_id.to_string(), price_id.to_string());
        Ok(snapshot)
    }

    async fn list_invoices(&self, customer_id: &str) -> Res<Vec<InvoiceSummary>> {
        self.record(BillingCall::ListInvoices(customer_id.to_string()));
        Ok(self
            .state()
            .invoices
            .iter()
            .filter(|(customer, _)| customer == customer_id)
            .map(|(_, invoice)| invoice.clone())
            .collect())
    }
}
