use actix_web::{Responder, delete, get, post, web};
use common::{error::Res, http::Success, jwt::JwtClaims};
use db::ServerStore;

use crate::{AppState, dtos::server::AdminServersResponse};

/// Lists every server with its provisioning state and last error.
#[get("")]
pub async fn get_servers(state: web::Data<AppState>) -> Res<impl Responder> {
    let servers = state.store.list_servers().await?;
    Success::ok(AdminServersResponse { servers })
}

#[post("/{id}/reprovision")]
pub async fn post_reprovision(
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> Res<impl Responder> {
    let server = state.billing().reprovision(path.into_inner()).await?;
    Success::ok(server)
}

/// Removes a server in any state, cancelling its subscription first.
#[delete("/{id}")]
pub async fn delete_server(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> Res<impl Responder> {
    state.billing().remove(&claims, path.into_inner()).await?;
    Success::no_content()
}
