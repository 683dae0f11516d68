use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{dtos::user::UserCreateRequest, models::user::User};

pub async fn get_user_by_email<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    email: &str,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_user_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn insert_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: UserCreateRequest,
) -> Res<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, first_name, last_name, is_admin, stripe_customer_id,
                           address_line1, address_line2, city, postal_code, country)
        VALUES (COALESCE($1, gen_random_uuid()), $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(data.id)
    .bind(data.email)
    .bind(data.first_name)
    .bind(data.last_name)
    .bind(data.is_admin)
    .bind(data.stripe_customer_id)
    .bind(data.address.line1)
    .bind(data.address.line2)
    .bind(data.address.city)
    .bind(data.address.postal_code)
    .bind(data.address.country)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn update_stripe_customer<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    customer_id: &str,
) -> Res<()> {
    sqlx::query("UPDATE users SET stripe_customer_id = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(customer_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Stores the panel account linked to a local user.
pub async fn update_panel_account<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    panel_user_id: i64,
    panel_user_uuid: &str,
) -> Res<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET pterodactyl_user_id = $2, pterodactyl_user_uuid = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(panel_user_id)
    .bind(panel_user_uuid)
    .execute(executor)
    .await?;
    Ok(())
}
