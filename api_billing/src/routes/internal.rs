use actix_web::{Responder, post, web};
use common::{error::Res, http::Success};

use crate::{
    AppState,
    dtos::user::{InternalUserRequest, InternalUserResponse},
    services,
};

/// Registers a user and their Stripe customer.
///
/// This endpoint is intended to be called by the identity service when an
/// account is created. It requires the `X-Internal-Key` header.
#[post("")]
pub async fn post_user(
    req: web::Json<InternalUserRequest>,
    state: web::Data<AppState>,
) -> Res<impl Responder> {
    let user = services::internal::create_user(&state.store, &state.gateway, req.into_inner()).await?;
    Success::created(InternalUserResponse {
        user_id: user.id,
        customer_id: user.stripe_customer_id.unwrap_or_default(),
    })
}
