use common::{
    billing::BillingGateway,
    error::{AppError, Res},
};
use db::{
    UserStore,
    dtos::user::{BillingAddress, UserCreateRequest},
    models::user::User,
};
use log::info;

use crate::dtos::user::InternalUserRequest;

/// Registers a user on behalf of the identity service together with the
/// Stripe customer that will own their subscriptions.
pub async fn create_user<U, G>(store: &U, gateway: &G, req: InternalUserRequest) -> Res<User>
where
    U: UserStore,
    G: BillingGateway,
{
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest(format!("Invalid email '{}'", req.email)));
    }
    if store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(format!("User {} already exists", email)));
    }

    let name = format!("{} {}", req.first_name, req.last_name);
    let user_id = req.id.unwrap_or_else(uuid::Uuid::new_v4);
    info!("Creating stripe customer for {}", name);
    let customer_id = gateway.create_customer(&email, &name, user_id).await?;

    store
        .create_user(UserCreateRequest {
            id: Some(user_id),
            email,
            first_name: req.first_name,
            last_name: req.last_name,
            is_admin: req.is_admin,
            stripe_customer_id: Some(customer_id),
            address: BillingAddress {
                line1: req.address_line1,
                line2: req.address_line2,
                city: req.city,
                postal_code: req.postal_code,
                country: req.country,
            },
        })
        .await
}
