mod support;

use api_billing::dtos::checkout::CheckoutCreateRequest;
use common::{
    error::AppError,
    misc::{BillingCycle, ServerStatus},
};
use pretty_assertions::assert_eq;
use support::Harness;
use test_utils::{BillingCall, factory, subscription};

const APP_URL: &str = "https://quark.test";

fn request(cycle: BillingCycle) -> CheckoutCreateRequest {
    CheckoutCreateRequest {
        name: " Survival ".to_string(),
        plan: "power".to_string(),
        game: "minecraft".to_string(),
        variant: "paper".to_string(),
        region: "eu-central".to_string(),
        billing_cycle: cycle,
    }
}

#[tokio::test]
async fn start_creates_pending_server_customer_and_session() {
    let h = Harness::new();

    let res = h
        .billing()
        .start_checkout(&h.claims(), request(BillingCycle::Yearly), APP_URL)
        .await
        .unwrap();

    let server = h.store.server(res.server_id).unwrap();
    assert_eq!(server.name, "Survival");
    assert_eq!(server.status, ServerStatus::Pending);
    assert_eq!(server.billing_cycle, BillingCycle::Yearly);
    assert_eq!(
        server.stripe_checkout_session_id.as_deref(),
        Some(res.session_id.as_str())
    );
    assert_eq!(res.url, format!("https://checkout.stripe.test/{}", res.session_id));

    let user = h.store.user(h.user.id).unwrap();
    assert_eq!(user.stripe_customer_id.as_deref(), Some("cus_test1"));
    assert_eq!(
        h.gateway.calls(),
        vec![
            BillingCall::CreateCustomer(factory::DEFAULT_EMAIL.to_string()),
            BillingCall::CreateCheckout {
                customer_id: "cus_test1".to_string(),
                price_id: factory::YEARLY_PRICE.to_string(),
                server_id: res.server_id,
            },
        ]
    );
}

#[tokio::test]
async fn start_reuses_existing_customer() {
    let mut h = Harness::new();
    let mut user = h.user.clone();
    user.stripe_customer_id = Some("cus_existing".to_string());
    h.user = h.store.insert_user(user);

    h.billing()
        .start_checkout(&h.claims(), request(BillingCycle::Monthly), APP_URL)
        .await
        .unwrap();

    assert!(matches!(
        h.gateway.calls().as_slice(),
        [BillingCall::CreateCheckout { customer_id, .. }] if customer_id == "cus_existing"
    ));
}

#[tokio::test]
async fn unknown_selection_is_a_bad_request() {
    let h = Harness::new();
    let mut req = request(BillingCycle::Monthly);
    req.region = "moon".to_string();

    let err = h
        .billing()
        .start_checkout(&h.claims(), req, APP_URL)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)), "{err:?}");
    assert!(h.gateway.calls().is_empty());
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let h = Harness::new();
    let mut req = request(BillingCycle::Monthly);
    req.name = "  ".to_string();

    let err = h
        .billing()
        .start_checkout(&h.claims(), req, APP_URL)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn complete_reads_back_session_when_webhook_is_late() {
    let h = Harness::new();
    let res = h
        .billing()
        .start_checkout(&h.claims(), request(BillingCycle::Monthly), APP_URL)
        .await
        .unwrap();

    // not paid yet
    let server = h
        .billing()
        .complete_checkout(&h.claims(), res.server_id)
        .await
        .unwrap();
    assert_eq!(server.status, ServerStatus::Pending);
    assert!(h.queue.enqueued_servers().is_empty());

    h.gateway.with_subscription(subscription("sub_1", "active"));
    h.gateway.complete_session(&res.session_id, "sub_1");

    let server = h
        .billing()
        .complete_checkout(&h.claims(), res.server_id)
        .await
        .unwrap();
    assert_eq!(server.status, ServerStatus::Active);
    assert_eq!(server.stripe_subscription_id.as_deref(), Some("sub_1"));
    assert_eq!(h.queue.enqueued_servers(), vec![res.server_id]);
}

#[tokio::test]
async fn complete_is_a_no_op_once_subscribed() {
    let h = Harness::new();
    h.server(|s| {
        s.stripe_subscription_id = Some("sub_1".into());
        s.status = ServerStatus::Active;
    });

    let server = h.billing().complete_checkout(&h.claims(), 1).await.unwrap();

    assert_eq!(server.status, ServerStatus::Active);
    assert!(h.gateway.calls().is_empty());
}

#[tokio::test]
async fn complete_on_someone_elses_server_is_forbidden() {
    let h = Harness::new();
    let other = h.store.insert_user(factory::user());
    h.store.insert_server(factory::server(other.id));

    let err = h
        .billing()
        .complete_checkout(&h.claims(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}
