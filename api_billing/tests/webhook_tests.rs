mod support;

use api_billing::services::webhook::{BillingEvent, SubscriptionChange};
use common::misc::{BillingCycle, ProvisionStatus, ServerStatus};
use pretty_assertions::assert_eq;
use support::Harness;
use test_utils::{PanelCall, subscription};

fn changed(kind: SubscriptionChange, id: &str, status: &str) -> BillingEvent {
    BillingEvent::SubscriptionChanged {
        kind,
        snapshot: subscription(id, status),
    }
}

#[tokio::test]
async fn activation_enqueues_provisioning_once() {
    let h = Harness::new();
    h.server(|s| s.stripe_subscription_id = Some("sub_1".into()));

    h.billing()
        .handle_event(changed(SubscriptionChange::Created, "sub_1", "active"))
        .await
        .unwrap();
    h.billing()
        .handle_event(changed(SubscriptionChange::Updated, "sub_1", "active"))
        .await
        .unwrap();

    assert_eq!(h.store.server(1).unwrap().status, ServerStatus::Active);
    assert_eq!(h.queue.enqueued_servers(), vec![1]);
    assert!(h.panel.calls().is_empty());
}

#[tokio::test]
async fn incomplete_subscription_leaves_server_pending() {
    let h = Harness::new();
    h.server(|s| s.stripe_subscription_id = Some("sub_1".into()));

    h.billing()
        .handle_event(changed(SubscriptionChange::Created, "sub_1", "incomplete"))
        .await
        .unwrap();

    assert_eq!(h.store.server(1).unwrap().status, ServerStatus::Pending);
    assert!(h.queue.enqueued_servers().is_empty());
}

#[tokio::test]
async fn past_due_suspends_and_recovery_unsuspends() {
    let h = Harness::new();
    h.server(|s| {
        s.stripe_subscription_id = Some("sub_1".into());
        s.status = ServerStatus::Active;
        s.provision_status = ProvisionStatus::Provisioned;
        s.pterodactyl_server_id = Some(11);
    });

    h.billing()
        .handle_event(changed(SubscriptionChange::Updated, "sub_1", "past_due"))
        .await
        .unwrap();
    assert_eq!(h.store.server(1).unwrap().status, ServerStatus::Suspended);

    h.billing()
        .handle_event(changed(SubscriptionChange::Updated, "sub_1", "active"))
        .await
        .unwrap();
    assert_eq!(h.store.server(1).unwrap().status, ServerStatus::Active);

    assert_eq!(
        h.panel.calls(),
        vec![PanelCall::Suspend(11), PanelCall::Unsuspend(11)]
    );
    assert!(h.queue.enqueued_servers().is_empty());
}

#[tokio::test]
async fn deleted_subscription_cancels_regardless_of_status() {
    let h = Harness::new();
    h.server(|s| {
        s.stripe_subscription_id = Some("sub_1".into());
        s.status = ServerStatus::Active;
        s.pterodactyl_server_id = Some(11);
    });

    h.billing()
        .handle_event(changed(SubscriptionChange::Deleted, "sub_1", "active"))
        .await
        .unwrap();

    assert_eq!(h.store.server(1).unwrap().status, ServerStatus::Cancelled);
    assert_eq!(h.panel.calls(), vec![PanelCall::Suspend(11)]);
}

#[tokio::test]
async fn panel_failure_does_not_block_status_change() {
    let h = Harness::new();
    h.server(|s| {
        s.stripe_subscription_id = Some("sub_1".into());
        s.status = ServerStatus::Active;
        s.pterodactyl_server_id = Some(11);
    });
    h.panel.fail_actions(500, "panel down");

    h.billing()
        .handle_event(changed(SubscriptionChange::Updated, "sub_1", "unpaid"))
        .await
        .unwrap();

    assert_eq!(h.store.server(1).unwrap().status, ServerStatus::Suspended);
}

#[tokio::test]
async fn unknown_subscription_is_acknowledged() {
    let h = Harness::new();

    h.billing()
        .handle_event(changed(SubscriptionChange::Updated, "sub_ghost", "active"))
        .await
        .unwrap();

    assert!(h.queue.enqueued_servers().is_empty());
}

#[tokio::test]
async fn pending_cycle_is_promoted_when_interval_matches() {
    let h = Harness::new();
    h.server(|s| {
        s.stripe_subscription_id = Some("sub_1".into());
        s.status = ServerStatus::Active;
        s.pterodactyl_server_id = Some(11);
        s.pending_billing_cycle = Some(BillingCycle::Yearly);
    });

    // still monthly: nothing to promote yet
    h.billing()
        .handle_event(changed(SubscriptionChange::Updated, "sub_1", "active"))
        .await
        .unwrap();
    assert_eq!(
        h.store.server(1).unwrap().pending_billing_cycle,
        Some(BillingCycle::Yearly)
    );

    let mut yearly = subscription("sub_1", "active");
    yearly.price_id = Some(test_utils::factory::YEARLY_PRICE.to_string());
    yearly.interval = Some("year".to_string());
    h.billing()
        .handle_event(BillingEvent::SubscriptionChanged {
            kind: SubscriptionChange::Updated,
            snapshot: yearly,
        })
        .await
        .unwrap();

    let server = h.store.server(1).unwrap();
    assert_eq!(server.billing_cycle, BillingCycle::Yearly);
    assert_eq!(server.pending_billing_cycle, None);
}

#[tokio::test]
async fn pending_cycle_without_interval_follows_catalog_price() {
    let h = Harness::new();
    h.server(|s| {
        s.stripe_subscription_id = Some("sub_1".into());
        s.status = ServerStatus::Active;
        s.pterodactyl_server_id = Some(11);
        s.pending_billing_cycle = Some(BillingCycle::Yearly);
    });

    let mut snapshot = subscription("sub_1", "active");
    snapshot.interval = None;
    h.billing()
        .handle_event(BillingEvent::SubscriptionChanged {
            kind: SubscriptionChange::Updated,
            snapshot: snapshot.clone(),
        })
        .await
        .unwrap();
    // still on the monthly price
    let server = h.store.server(1).unwrap();
    assert_eq!(server.billing_cycle, BillingCycle::Monthly);
    assert_eq!(server.pending_billing_cycle, Some(BillingCycle::Yearly));

    snapshot.price_id = Some(test_utils::factory::YEARLY_PRICE.to_string());
    h.billing()
        .handle_event(BillingEvent::SubscriptionChanged {
            kind: SubscriptionChange::Updated,
            snapshot,
        })
        .await
        .unwrap();

    let server = h.store.server(1).unwrap();
    assert_eq!(server.billing_cycle, BillingCycle::Yearly);
    assert_eq!(server.pending_billing_cycle, None);
}

#[tokio::test]
async fn pending_cycle_is_promoted_when_price_is_unknown() {
    let h = Harness::new();
    h.server(|s| {
        s.stripe_subscription_id = Some("sub_1".into());
        s.status = ServerStatus::Active;
        s.pterodactyl_server_id = Some(11);
        s.pending_billing_cycle = Some(BillingCycle::Yearly);
    });

    let mut snapshot = subscription("sub_1", "active");
    snapshot.interval = None;
    snapshot.price_id = None;
    h.billing()
        .handle_event(BillingEvent::SubscriptionChanged {
            kind: SubscriptionChange::Updated,
            snapshot,
        })
        .await
        .unwrap();

    assert_eq!(
        h.store.server(1).unwrap().billing_cycle,
        BillingCycle::Yearly
    );
}

#[tokio::test]
async fn scheduled_cycle_switch_lands_on_renewal() {
    let h = Harness::new();
    h.gateway.with_subscription(subscription("sub_1", "active"));
    h.server(|s| {
        s.stripe_subscription_id = Some("sub_1".into());
        s.status = ServerStatus::Active;
        s.provision_status = ProvisionStatus::Provisioned;
        s.pterodactyl_server_id = Some(11);
    });
    h.billing()
        .switch_billing_cycle(&h.claims(), 1, BillingCycle::Yearly)
        .await
        .unwrap();

    // the update Stripe sends for the schedule itself still shows the old price
    let before = h.gateway.subscription("sub_1").unwrap();
    h.billing()
        .handle_event(BillingEvent::SubscriptionChanged {
            kind: SubscriptionChange::Updated,
            snapshot: before,
        })
        .await
        .unwrap();
    let server = h.store.server(1).unwrap();
    assert_eq!(server.billing_cycle, BillingCycle::Monthly);
    assert_eq!(server.pending_billing_cycle, Some(BillingCycle::Yearly));

    let renewed = h.gateway.renew("sub_1").unwrap();
    h.billing()
        .handle_event(BillingEvent::SubscriptionChanged {
            kind: SubscriptionChange::Updated,
            snapshot: renewed,
        })
        .await
        .unwrap();

    let server = h.store.server(1).unwrap();
    assert_eq!(server.billing_cycle, BillingCycle::Yearly);
    assert_eq!(server.pending_billing_cycle, None);
    assert_eq!(h.gateway.scheduled_price("sub_1"), None);
}

#[tokio::test]
async fn checkout_completed_attaches_subscription_and_syncs_status() {
    let h = Harness::new();
    h.server(|s| s.stripe_checkout_session_id = Some("cs_test_1".into()));
    h.gateway.with_subscription(subscription("sub_1", "active"));

    h.billing()
        .handle_event(BillingEvent::CheckoutCompleted {
            session_id: "cs_test_1".into(),
            server_id: Some(1),
            subscription_id: Some("sub_1".into()),
        })
        .await
        .unwrap();

    let server = h.store.server(1).unwrap();
    assert_eq!(server.stripe_subscription_id.as_deref(), Some("sub_1"));
    assert_eq!(server.status, ServerStatus::Active);
    assert_eq!(h.queue.enqueued_servers(), vec![1]);
}

#[tokio::test]
async fn checkout_for_unknown_server_is_acknowledged() {
    let h = Harness::new();

    h.billing()
        .handle_event(BillingEvent::CheckoutCompleted {
            session_id: "cs_test_1".into(),
            server_id: Some(99),
            subscription_id: Some("sub_1".into()),
        })
        .await
        .unwrap();

    assert!(h.gateway.calls().is_empty());
}

#[tokio::test]
async fn paid_invoice_refetches_subscription() {
    let h = Harness::new();
    h.server(|s| {
        s.stripe_subscription_id = Some("sub_1".into());
        s.status = ServerStatus::Suspended;
        s.pterodactyl_server_id = Some(11);
    });
    h.gateway.with_subscription(subscription("sub_1", "active"));

    h.billing()
        .handle_event(BillingEvent::InvoicePaid {
            subscription_id: "sub_1".into(),
        })
        .await
        .unwrap();

    assert_eq!(h.store.server(1).unwrap().status, ServerStatus::Active);
    assert_eq!(h.panel.calls(), vec![PanelCall::Unsuspend(11)]);
}

#[tokio::test]
async fn failed_provisioning_is_not_requeued_by_billing_events() {
    let h = Harness::new();
    h.server(|s| {
        s.stripe_subscription_id = Some("sub_1".into());
        s.status = ServerStatus::Active;
        s.provision_status = ProvisionStatus::Failed;
    });

    h.billing()
        .handle_event(changed(SubscriptionChange::Updated, "sub_1", "active"))
        .await
        .unwrap();

    assert!(h.queue.enqueued_servers().is_empty());
}
