use std::sync::Arc;

use actix_web::{Responder, post, web};
use common::{env_config::Config, error::Res, http::Success, jwt::JwtClaims};

use crate::{
    AppState,
    dtos::{checkout::CheckoutCreateRequest, server::ServerResponse},
};

/// Starts a subscription checkout for a new server.
///
/// # Input
/// - `claims`: JWT claims of the buyer
/// - `req`: JSON body with `name`, `plan`, `game`, `variant`, `region` and
///   `billing_cycle` (`monthly` or `yearly`)
///
/// # Output
/// - Success: 201 Created with `{ server_id, session_id, url }`; redirect the
///   browser to `url`
/// - Error: 400 Bad Request for unknown catalog entries or an invalid name
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/servers/checkout', {
///   method: 'POST',
///   headers: {
///     'Content-Type': 'application/json',
///     'Authorization': `Bearer ${token}`
///   },
///   body: JSON.stringify({
///     name: "Survival",
///     plan: "power",
///     game: "minecraft",
///     variant: "paper",
///     region: "eu-central",
///     billing_cycle: "monthly"
///   })
/// });
/// const { url } = await response.json();
/// window.location.href = url;
/// ```
#[post("/checkout")]
pub async fn post_checkout(
    claims: web::ReqData<JwtClaims>,
    req: web::Json<CheckoutCreateRequest>,
    config: web::Data<Arc<Config>>,
    state: web::Data<AppState>,
) -> Res<impl Responder> {
    let response = state
        .billing()
        .start_checkout(&claims, req.into_inner(), &config.app_url)
        .await?;
    Success::created(response)
}

/// Called by the frontend on the checkout success page. Returns the server,
/// which stays `pending` until Stripe reports the subscription.
#[post("/{id}/checkout/complete")]
pub async fn post_checkout_complete(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> Res<impl Responder> {
    let server = state
        .billing()
        .complete_checkout(&claims, path.into_inner())
        .await?;
    Success::ok(ServerResponse::from(server))
}
