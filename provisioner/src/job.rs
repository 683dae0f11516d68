use common::{
    catalog::Catalog,
    error::{AppError, Res},
    misc::{ProvisionStatus, ServerStatus, server_external_id},
};
use db::{
    ServerStore, UserStore,
    models::{
        server::{PanelServerIds, Server},
        user::User,
    },
};
use log::{info, warn};
use panel::{
    NewPanelServer, NewPanelUser, PanelApi, PanelServer,
    dtos::{ServerDeploy, ServerFeatureLimits, ServerLimits, panel_username},
};
use uuid::Uuid;

use crate::environment::{interpolate, placeholders};

/// What a provisioning run ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The server row no longer exists.
    Missing,
    /// The server already has a panel id; nothing was called.
    AlreadyProvisioned,
    /// The server was suspended or cancelled before the job ran.
    Inactive(ServerStatus),
    /// A panel server with our external id existed and was linked.
    Adopted(PanelServerIds),
    Created(PanelServerIds),
}

/// Makes sure the server has exactly one panel server and records it.
///
/// Safe to run any number of times for the same server: the external id
/// lookup adopts a panel server left behind by an earlier attempt. Any error
/// is recorded on the server as `failed` before being returned.
pub async fn provision_server<S, P>(
    store: &S,
    panel: &P,
    catalog: &Catalog,
    server_id: i64,
) -> Res<ProvisionOutcome>
where
    S: ServerStore + UserStore,
    P: PanelApi,
{
    let Some(server) = store.get_server(server_id).await? else {
        warn!("Server {} no longer exists, skipping provisioning", server_id);
        return Ok(ProvisionOutcome::Missing);
    };
    if server.is_provisioned() {
        info!("Server {} already provisioned", server_id);
        return Ok(ProvisionOutcome::AlreadyProvisioned);
    }
    if matches!(
        server.status,
        ServerStatus::Suspended | ServerStatus::Cancelled
    ) {
        info!(
            "Server {} is {}, skipping provisioning",
            server_id, server.status
        );
        return Ok(ProvisionOutcome::Inactive(server.status));
    }

    store
        .set_provision_status(server_id, ProvisionStatus::Provisioning, None)
        .await?;

    match provision(store, panel, catalog, &server).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            let message = e.to_string();
            warn!("Provisioning server {} failed: {}", server_id, message);
            store
                .set_provision_status(server_id, ProvisionStatus::Failed, Some(&message))
                .await?;
            Err(e)
        }
    }
}

async fn provision<S, P>(
    store: &S,
    panel: &P,
    catalog: &Catalog,
    server: &Server,
) -> Res<ProvisionOutcome>
where
    S: ServerStore + UserStore,
    P: PanelApi,
{
    let owner = store
        .get_user(server.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("owner of server {} not found", server.id)))?;
    let panel_user_id = resolve_panel_user(store, panel, &owner).await?;

    let plan = catalog.plan(&server.plan)?;
    let variant = catalog.variant(&server.game, &server.variant)?;
    let region = catalog.region(&server.region)?;

    let external_id = server_external_id(server.id);
    store.set_external_id(server.id, &external_id).await?;

    if let Some(existing) = panel.find_server_by_external_id(&external_id).await? {
        let ids = panel_ids(&existing);
        store.attach_panel_server(server.id, &ids).await?;
        info!(
            "Adopted panel server {} for server {}",
            existing.identifier, server.id
        );
        return Ok(ProvisionOutcome::Adopted(ids));
    }

    let values = placeholders(server, &plan.limits, region);
    let body = NewPanelServer {
        name: server.name.clone(),
        user: panel_user_id,
        egg: variant.egg,
        docker_image: variant.docker_image.clone(),
        startup: variant.startup.clone(),
        environment: interpolate(&variant.environment, &values),
        limits: ServerLimits {
            memory: plan.limits.memory,
            swap: plan.limits.swap,
            disk: plan.limits.disk,
            io: plan.limits.io,
            cpu: plan.limits.cpu,
        },
        feature_limits: ServerFeatureLimits {
            databases: plan.feature_limits.databases,
            allocations: plan.feature_limits.allocations,
            backups: plan.feature_limits.backups,
        },
        deploy: ServerDeploy {
            locations: region.locations.clone(),
            dedicated_ip: region.dedicated_ip,
            port_range: region.port_range.clone(),
        },
        external_id,
        start_on_completion: true,
    };

    let created = panel.create_server(&body).await?;
    let ids = panel_ids(&created);
    store.attach_panel_server(server.id, &ids).await?;
    info!(
        "Created panel server {} for server {}",
        created.identifier, server.id
    );
    Ok(ProvisionOutcome::Created(ids))
}

/// Returns the panel user id for the owner, creating and linking an account
/// when none exists yet.
async fn resolve_panel_user<S, P>(store: &S, panel: &P, owner: &User) -> Res<i64>
where
    S: UserStore,
    P: PanelApi,
{
    if let Some(id) = owner.pterodactyl_user_id {
        return Ok(id);
    }

    let panel_user = match panel.find_user_by_email(&owner.email).await? {
        Some(existing) => existing,
        None => {
            panel
                .create_user(&NewPanelUser {
                    email: owner.email.clone(),
                    username: panel_username(&owner.email, owner.id),
                    first_name: owner.first_name.clone(),
                    last_name: owner.last_name.clone(),
                    password: Uuid::new_v4().to_string(),
                    external_id: Some(format!("quark:user:{}", owner.id)),
                })
                .await?
        }
    };

    store
        .link_panel_account(owner.id, panel_user.id, &panel_user.uuid)
        .await?;
    Ok(panel_user.id)
}

fn panel_ids(server: &PanelServer) -> PanelServerIds {
    PanelServerIds {
        id: server.id,
        uuid: server.uuid.clone(),
        identifier: server.identifier.clone(),
        internal_id: server.internal_id,
    }
}
