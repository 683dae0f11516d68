use std::sync::Arc;

use actix_web::{HttpRequest, Responder, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
};

use crate::{AppState, services::webhook};

/// Handles Stripe webhook events that drive the server lifecycle.
///
/// # Input
/// - `payload`: Raw request body, verified against the `stripe-signature` header
/// - `config`: Application configuration with the webhook secret
///
/// # Output
/// - Success: 200 OK once the event is applied, or when it concerns a
///   subscription this service does not know
/// - Error: 400 Bad Request for a missing or invalid signature, 5xx when the
///   event could not be applied (Stripe retries it)
///
/// # Stripe Configuration
/// Point an endpoint at `https://<host>/api/billing/webhook` and subscribe to
/// `checkout.session.completed`, `customer.subscription.created`,
/// `customer.subscription.updated`, `customer.subscription.deleted` and
/// `invoice.paid`.
#[post("/webhook")]
pub async fn post_webhook(
    payload: String,
    req: HttpRequest,
    config: web::Data<Arc<Config>>,
    state: web::Data<AppState>,
) -> Res<impl Responder> {
    let signature = match req.headers().get("stripe-signature") {
        Some(signature) => signature.to_str().unwrap_or(""),
        None => return Err(AppError::BadRequest("Stripe signature missing".to_string())),
    };

    let event = webhook::construct_event(&payload, signature, &config.stripe_webhook_secret)?;
    log::info!("Processing webhook event {} ({})", event.id, event.type_);
    state.billing().handle_event(webhook::translate(event)).await?;

    Success::ok("Webhook processed successfully")
}
