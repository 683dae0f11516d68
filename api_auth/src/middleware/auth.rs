use std::{future::Future, pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    Error, HttpMessage, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use common::jwt;
use futures::future::{Ready, ok};

pub struct AuthMiddleware {
    secret: Rc<String>,
    require_admin: bool,
}

impl AuthMiddleware {
    pub fn new(secret: String, require_admin: bool) -> Self {
        AuthMiddleware {
            secret: Rc::new(secret),
            require_admin,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Arc::new(service),
            secret: self.secret.clone(),
            require_admin: self.require_admin,
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
    secret: Rc<String>,
    require_admin: bool,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = bearer_token(&req);
        let secret = self.secret.clone();
        let require_admin = self.require_admin;
        let srv = Arc::clone(&self.service);

        Box::pin(async move {
            let Some(token) = token else {
                // no token passed - 401
                let response = HttpResponse::Unauthorized()
                    .json(serde_json::json!({"error": "No authorization token provided"}))
                    .map_into_boxed_body();
                return Ok(req.into_response(response));
            };

            match jwt::validate_jwt(&token, &secret) {
                Ok(claims) if require_admin && !claims.is_admin => {
                    log::warn!("User {} denied admin route {}", claims.user_id, req.path());
                    let response = HttpResponse::Forbidden()
                        .json(serde_json::json!({"error": "Admin privileges required"}))
                        .map_into_boxed_body();
                    Ok(req.into_response(response))
                }
                Ok(claims) => {
                    // claims are read by handlers through web::ReqData<JwtClaims>
                    req.extensions_mut().insert(claims);
                    srv.call(req).await.map(|res| res.map_into_boxed_body())
                }
                Err(_) => {
                    let response = HttpResponse::Unauthorized()
                        .json(serde_json::json!({"error": "Invalid token"}))
                        .map_into_boxed_body();
                    Ok(req.into_response(response))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, HttpResponse, http::StatusCode, test, web};
    use common::{
        env_config::JwtConfig,
        jwt::{NewClaims, JwtClaims, generate_jwt},
    };
    use uuid::Uuid;

    use crate::{admin_middleware, auth_middleware};

    const SECRET: &str = "test-secret";

    fn token(is_admin: bool) -> String {
        generate_jwt(
            NewClaims {
                user_id: Uuid::new_v4(),
                email: "player@example.com".to_string(),
                is_admin,
            },
            &JwtConfig {
                secret: SECRET.to_string(),
                expiration_hours: 1,
            },
        )
        .unwrap()
    }

    async fn whoami(claims: web::ReqData<JwtClaims>) -> HttpResponse {
        HttpResponse::Ok().body(claims.email.clone())
    }

    #[actix_web::test]
    async fn valid_token_reaches_handler_with_claims() {
        let app = test::init_service(
            App::new().service(
                web::scope("/dashboard")
                    .wrap(auth_middleware(SECRET))
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/dashboard/me")
            .insert_header(("Authorization", format!("Bearer {}", token(false))))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = test::read_body(res).await;
        assert_eq!(body, "player@example.com");
    }

    #[actix_web::test]
    async fn missing_or_invalid_token_is_unauthorized() {
        let app = test::init_service(
            App::new().service(
                web::scope("/dashboard")
                    .wrap(auth_middleware(SECRET))
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/dashboard/me").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::get()
            .uri("/dashboard/me")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn admin_scope_rejects_regular_users() {
        let app = test::init_service(
            App::new().service(
                web::scope("/admin")
                    .wrap(admin_middleware(SECRET))
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/admin/me")
            .insert_header(("Authorization", format!("Bearer {}", token(false))))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );

        let req = test::TestRequest::get()
            .uri("/admin/me")
            .insert_header(("Authorization", format!("Bearer {}", token(true))))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }
}
