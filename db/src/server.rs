use chrono::NaiveDateTime;
use common::{
    error::{AppError, Res},
    misc::{BillingCycle, ProvisionStatus, ServerStatus},
};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::server::ServerCreateRequest,
    models::server::{PanelServerIds, Server},
};

/// Inserts a pending server row and fills in its subscription name.
pub async fn insert_server<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: ServerCreateRequest,
) -> Res<Server> {
    sqlx::query_as::<_, Server>(
        r#"
        INSERT INTO servers (user_id, name, plan, game, variant, region, billing_cycle, status, provision_status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.name)
    .bind(data.plan)
    .bind(data.game)
    .bind(data.variant)
    .bind(data.region)
    .bind(data.billing_cycle)
    .bind(ServerStatus::Pending)
    .bind(ProvisionStatus::Unprovisioned)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn set_subscription_name<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
    name: &str,
) -> Res<Server> {
    sqlx::query_as::<_, Server>(
        "UPDATE servers SET subscription_name = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_server<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
) -> Res<Option<Server>> {
    sqlx::query_as::<_, Server>("SELECT * FROM servers WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_server_by_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    subscription_id: &str,
) -> Res<Option<Server>> {
    sqlx::query_as::<_, Server>("SELECT * FROM servers WHERE stripe_subscription_id = $1")
        .bind(subscription_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn list_servers_by_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Vec<Server>> {
    sqlx::query_as::<_, Server>("SELECT * FROM servers WHERE user_id = $1 ORDER BY id")
        .bind(user_id)
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

pub async fn list_servers<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
) -> Res<Vec<Server>> {
    sqlx::query_as::<_, Server>("SELECT * FROM servers ORDER BY id DESC")
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

pub async fn update_provision_status<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
    status: ProvisionStatus,
    error: Option<&str>,
) -> Res<()> {
    sqlx::query(
        "UPDATE servers SET provision_status = $2, provision_error = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(status)
    .bind(error)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn update_external_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
    external_id: &str,
) -> Res<()> {
    sqlx::query("UPDATE servers SET external_id = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(external_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Persists panel identifiers and marks the server provisioned. Only a
/// pending or active server becomes active; a suspension or cancellation
/// that landed meanwhile is kept.
pub async fn attach_panel_server<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
    panel: &PanelServerIds,
) -> Res<()> {
    sqlx::query(
        r#"
        UPDATE servers
        SET pterodactyl_server_id = $2,
            pterodactyl_server_uuid = $3,
            pterodactyl_server_identifier = $4,
            pterodactyl_internal_id = $5,
            provision_status = $6,
            provision_error = NULL,
            status = CASE WHEN status IN ($7, $8) THEN $8 ELSE status END,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(panel.id)
    .bind(&panel.uuid)
    .bind(&panel.identifier)
    .bind(panel.internal_id)
    .bind(ProvisionStatus::Provisioned)
    .bind(ServerStatus::Pending)
    .bind(ServerStatus::Active)
    .execute(executor)
    .await?;
    Ok(())
}

/// Clears the panel identifiers after the panel server was deleted.
pub async fn detach_panel_server<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
) -> Res<()> {
    sqlx::query(
        r#"
        UPDATE servers
        SET pterodactyl_server_id = NULL,
            pterodactyl_server_uuid = NULL,
            pterodactyl_server_identifier = NULL,
            pterodactyl_internal_id = NULL,
            provision_status = $2,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(ProvisionStatus::Unprovisioned)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn update_status<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
    status: ServerStatus,
) -> Res<()> {
    sqlx::query("UPDATE servers SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn update_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
    subscription_id: &str,
    current_period_end: Option<NaiveDateTime>,
) -> Res<()> {
    sqlx::query(
        r#"
        UPDATE servers
        SET stripe_subscription_id = $2,
            current_period_end = COALESCE($3, current_period_end),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(subscription_id)
    .bind(current_period_end)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn update_checkout_session<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
    session_id: &str,
) -> Res<()> {
    sqlx::query(
        "UPDATE servers SET stripe_checkout_session_id = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(session_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn update_billing_cycle<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
    cycle: BillingCycle,
    pending: Option<BillingCycle>,
) -> Res<()> {
    sqlx::query(
        "UPDATE servers SET billing_cycle = $2, pending_billing_cycle = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(cycle)
    .bind(pending)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn update_cancel_at_period_end<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
    cancel_at_period_end: bool,
) -> Res<()> {
    sqlx::query(
        "UPDATE servers SET cancel_at_period_end = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(cancel_at_period_end)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn delete_server<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
) -> Res<()> {
    sqlx::query("DELETE FROM servers WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
