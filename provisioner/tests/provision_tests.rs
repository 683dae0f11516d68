use common::{
    error::AppError,
    misc::{ProvisionStatus, ServerStatus},
};
use db::{
    ServerStore,
    models::server::{PanelServerIds, Server},
};
use pretty_assertions::assert_eq;
use provisioner::{ProvisionOutcome, provision_server};
use test_utils::{FakePanel, MemoryStore, PanelCall, factory};

fn setup() -> (MemoryStore, FakePanel, Server) {
    let store = MemoryStore::new();
    let panel = FakePanel::new();
    let user = store.insert_user(factory::user());
    let server = store.insert_server(Server {
        id: 42,
        subscription_name: "server_42".to_string(),
        status: ServerStatus::Active,
        ..factory::server(user.id)
    });
    (store, panel, server)
}

#[tokio::test]
async fn provisions_new_server_for_user_without_panel_account() {
    let (store, panel, server) = setup();
    let catalog = factory::catalog();

    let outcome = provision_server(&store, &panel, &catalog, 42).await.unwrap();
    assert!(matches!(outcome, ProvisionOutcome::Created(_)));

    let calls = panel.calls();
    assert_eq!(
        calls[0],
        PanelCall::FindUserByEmail(factory::DEFAULT_EMAIL.to_string())
    );
    assert!(matches!(&calls[1], PanelCall::CreateUser(u) if u.email == factory::DEFAULT_EMAIL));
    assert_eq!(
        calls[2],
        PanelCall::FindServerByExternalId("quark:server:42".to_string())
    );

    let created = panel.created_servers();
    assert_eq!(created.len(), 1);
    let body = &created[0];
    assert_eq!(body.external_id, "quark:server:42");
    assert_eq!(body.egg, 5);
    assert_eq!(body.limits.memory, 8192);
    assert_eq!(body.limits.cpu, 400);
    assert_eq!(body.feature_limits.backups, 3);
    assert_eq!(body.deploy.locations, vec![1]);
    assert_eq!(body.deploy.port_range, vec!["25565-25665".to_string()]);
    assert_eq!(body.environment["MOTD"], "Survival in Frankfurt");
    assert_eq!(body.environment["SERVER_JARFILE"], "server.jar");
    assert!(body.start_on_completion);

    let owner = store.user(server.user_id).unwrap();
    assert_eq!(Some(body.user), owner.pterodactyl_user_id);
    assert!(owner.pterodactyl_user_uuid.is_some());

    let saved = store.server(42).unwrap();
    assert_eq!(saved.provision_status, ProvisionStatus::Provisioned);
    assert_eq!(saved.status, ServerStatus::Active);
    assert_eq!(saved.external_id.as_deref(), Some("quark:server:42"));
    assert!(saved.pterodactyl_server_id.is_some());
    assert!(saved.pterodactyl_server_identifier.is_some());
    assert_eq!(saved.provision_error, None);
}

#[tokio::test]
async fn second_run_adopts_instead_of_creating() {
    let (store, panel, _) = setup();
    let catalog = factory::catalog();

    let first = provision_server(&store, &panel, &catalog, 42).await.unwrap();
    let ProvisionOutcome::Created(created) = first else {
        panic!("expected a created server, got {first:?}");
    };

    // Simulate a crash after the panel call but before the ids were saved.
    store.detach_panel_server(42).await.unwrap();

    let second = provision_server(&store, &panel, &catalog, 42).await.unwrap();
    assert_eq!(second, ProvisionOutcome::Adopted(created.clone()));
    assert_eq!(panel.created_servers().len(), 1);
    assert_eq!(
        store.server(42).unwrap().pterodactyl_server_id,
        Some(created.id)
    );
}

#[tokio::test]
async fn adopts_server_already_on_panel() {
    let (store, panel, _) = setup();
    let existing = panel.with_server("quark:server:42");

    let outcome = provision_server(&store, &panel, &factory::catalog(), 42)
        .await
        .unwrap();

    assert!(matches!(outcome, ProvisionOutcome::Adopted(ids) if ids.id == existing.id));
    assert!(panel.created_servers().is_empty());
}

#[tokio::test]
async fn provisioned_server_is_left_alone() {
    let (store, panel, server) = setup();
    store.insert_server(Server {
        pterodactyl_server_id: Some(7),
        provision_status: ProvisionStatus::Provisioned,
        ..server
    });

    let outcome = provision_server(&store, &panel, &factory::catalog(), 42)
        .await
        .unwrap();

    assert_eq!(outcome, ProvisionOutcome::AlreadyProvisioned);
    assert!(panel.calls().is_empty());
}

#[tokio::test]
async fn cancelled_or_suspended_server_is_not_provisioned() {
    for status in [ServerStatus::Cancelled, ServerStatus::Suspended] {
        let (store, panel, server) = setup();
        store.insert_server(Server { status, ..server });

        let outcome = provision_server(&store, &panel, &factory::catalog(), 42)
            .await
            .unwrap();

        assert_eq!(outcome, ProvisionOutcome::Inactive(status));
        assert!(panel.calls().is_empty());
        let server = store.server(42).unwrap();
        assert_eq!(server.status, status);
        assert_eq!(server.provision_status, ProvisionStatus::Unprovisioned);
    }
}

#[tokio::test]
async fn attaching_panel_server_keeps_a_cancellation() {
    let (store, _panel, server) = setup();
    store.insert_server(Server {
        status: ServerStatus::Cancelled,
        ..server
    });
    let ids = PanelServerIds {
        id: 7,
        uuid: "uuid-7".to_string(),
        identifier: "abc7".to_string(),
        internal_id: Some(7),
    };

    store.attach_panel_server(42, &ids).await.unwrap();

    let server = store.server(42).unwrap();
    assert_eq!(server.status, ServerStatus::Cancelled);
    assert_eq!(server.provision_status, ProvisionStatus::Provisioned);
    assert_eq!(server.pterodactyl_server_id, Some(7));
}

#[tokio::test]
async fn missing_server_is_not_an_error() {
    let store = MemoryStore::new();
    let panel = FakePanel::new();

    let outcome = provision_server(&store, &panel, &factory::catalog(), 9)
        .await
        .unwrap();

    assert_eq!(outcome, ProvisionOutcome::Missing);
    assert!(panel.calls().is_empty());
}

#[tokio::test]
async fn linked_panel_account_is_reused_without_lookup() {
    let store = MemoryStore::new();
    let panel = FakePanel::new();
    let user = store.insert_user(db::models::user::User {
        pterodactyl_user_id: Some(77),
        pterodactyl_user_uuid: Some("linked".to_string()),
        ..factory::user()
    });
    store.insert_server(factory::server(user.id));

    provision_server(&store, &panel, &factory::catalog(), 1)
        .await
        .unwrap();

    let calls = panel.calls();
    assert!(!calls.iter().any(|c| matches!(c, PanelCall::FindUserByEmail(_))));
    assert_eq!(panel.created_servers()[0].user, 77);
}

#[tokio::test]
async fn existing_panel_account_is_linked() {
    let (store, panel, server) = setup();
    let account = panel.with_user(factory::DEFAULT_EMAIL);

    provision_server(&store, &panel, &factory::catalog(), 42)
        .await
        .unwrap();

    assert!(!panel.calls().iter().any(|c| matches!(c, PanelCall::CreateUser(_))));
    let owner = store.user(server.user_id).unwrap();
    assert_eq!(owner.pterodactyl_user_id, Some(account.id));
}

#[tokio::test]
async fn panel_failure_marks_server_failed_and_returns_error() {
    let (store, panel, _) = setup();
    panel.fail_create_server(422, "The selected egg is invalid.");

    let err = provision_server(&store, &panel, &factory::catalog(), 42)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Panel { status: 422, .. }));

    let saved = store.server(42).unwrap();
    assert_eq!(saved.provision_status, ProvisionStatus::Failed);
    assert!(
        saved
            .provision_error
            .as_deref()
            .is_some_and(|e| e.contains("The selected egg is invalid."))
    );
    assert_eq!(saved.pterodactyl_server_id, None);
}

#[tokio::test]
async fn unknown_catalog_entry_fails_before_panel_server_calls() {
    let (store, panel, server) = setup();
    store.insert_server(Server {
        region: "mars-1".to_string(),
        ..server
    });

    let err = provision_server(&store, &panel, &factory::catalog(), 42)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Config(ref m) if m.contains("mars-1")));
    assert_eq!(
        store.server(42).unwrap().provision_status,
        ProvisionStatus::Failed
    );
    assert!(panel.created_servers().is_empty());
    assert!(
        !panel
            .calls()
            .iter()
            .any(|c| matches!(c, PanelCall::FindServerByExternalId(_)))
    );
}
