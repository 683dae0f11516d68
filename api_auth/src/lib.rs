use middleware::{auth::AuthMiddleware, internal::InternalKeyMiddleware};

pub mod middleware {
    pub mod auth;
    pub mod internal;
}

/// Requires a valid bearer JWT and stores its `JwtClaims` in the request.
pub fn auth_middleware(secret: &str) -> AuthMiddleware {
    AuthMiddleware::new(secret.to_string(), false)
}

/// Like [`auth_middleware`] but also requires `is_admin` in the claims.
pub fn admin_middleware(secret: &str) -> AuthMiddleware {
    AuthMiddleware::new(secret.to_string(), true)
}

/// Guards server-to-server routes with the shared `X-Internal-Key`.
pub fn internal_middleware(key: &str) -> InternalKeyMiddleware {
    InternalKeyMiddleware::new(key.to_string())
}
