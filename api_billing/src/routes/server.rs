use actix_web::{Responder, delete, get, post, web};
use common::{error::Res, http::Success, jwt::JwtClaims};

use crate::{
    AppState,
    dtos::server::{BillingCycleRequest, InvoicesResponse, ServerResponse, ServersResponse},
};

#[get("")]
pub async fn get_servers(
    claims: web::ReqData<JwtClaims>,
    state: web::Data<AppState>,
) -> Res<impl Responder> {
    let servers = state.billing().list_servers(&claims).await?;
    Success::ok(ServersResponse {
        servers: servers.into_iter().map(ServerResponse::from).collect(),
    })
}

#[get("/{id}")]
pub async fn get_server(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> Res<impl Responder> {
    let server = state.billing().owned_server(&claims, path.into_inner()).await?;
    Success::ok(ServerResponse::from(server))
}

/// Cancels the subscription at the end of the current period.
///
/// # Output
/// - Success: the server with `cancel_at_period_end: true`
/// - Error: 403 for someone else's server, 409 when there is no subscription
#[post("/{id}/cancel")]
pub async fn post_cancel(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> Res<impl Responder> {
    let server = state.billing().cancel(&claims, path.into_inner()).await?;
    Success::ok(ServerResponse::from(server))
}

#[post("/{id}/resume")]
pub async fn post_resume(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> Res<impl Responder> {
    let server = state.billing().resume(&claims, path.into_inner()).await?;
    Success::ok(ServerResponse::from(server))
}

/// Switches between monthly and yearly billing from the next renewal.
///
/// # Input
/// - `req`: `{ "billing_cycle": "yearly" }`
///
/// # Output
/// - Success: the server with `pending_billing_cycle` set
/// - Error: 400 when the server is already on that cycle
#[post("/{id}/billing-cycle")]
pub async fn post_billing_cycle(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<i64>,
    req: web::Json<BillingCycleRequest>,
    state: web::Data<AppState>,
) -> Res<impl Responder> {
    let server = state
        .billing()
        .switch_billing_cycle(&claims, path.into_inner(), req.billing_cycle)
        .await?;
    Success::ok(ServerResponse::from(server))
}

#[delete("/{id}")]
pub async fn delete_server(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> Res<impl Responder> {
    state.billing().remove(&claims, path.into_inner()).await?;
    Success::no_content()
}

#[get("")]
pub async fn get_invoices(
    claims: web::ReqData<JwtClaims>,
    state: web::Data<AppState>,
) -> Res<impl Responder> {
    let invoices = state.billing().list_invoices(&claims).await?;
    Success::ok(InvoicesResponse { invoices })
}
