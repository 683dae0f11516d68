use std::{future::Future, pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    Error, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures::future::{Ready, ok};
use subtle::ConstantTimeEq;

pub const INTERNAL_KEY_HEADER: &str = "X-Internal-Key";

/// Accepts requests carrying the configured shared key. An empty configured
/// key rejects everything.
pub struct InternalKeyMiddleware {
    key: Rc<String>,
}

impl InternalKeyMiddleware {
    pub fn new(key: String) -> Self {
        InternalKeyMiddleware { key: Rc::new(key) }
    }
}

/// Compares without short-circuiting on the first differing byte.
fn key_matches(provided: &str, expected: &str) -> bool {
    !expected.is_empty()
        && provided.len() == expected.len()
        && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}

impl<S, B> Transform<S, ServiceRequest> for InternalKeyMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = InternalKeyMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(InternalKeyMiddlewareService {
            service: Arc::new(service),
            key: self.key.clone(),
        })
    }
}

pub struct InternalKeyMiddlewareService<S> {
    service: Arc<S>,
    key: Rc<String>,
}

impl<S, B> Service<ServiceRequest> for InternalKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let provided = req
            .headers()
            .get(INTERNAL_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let authorized = key_matches(provided, &self.key);

        if !authorized {
            log::warn!("Rejected internal call to {} without a valid key", req.path());
            let response = HttpResponse::Forbidden()
                .json(serde_json::json!({"error": "Invalid internal key"}))
                .map_into_boxed_body();
            return Box::pin(async move { Ok(req.into_response(response)) });
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(|res| res.map_into_boxed_body()) })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, HttpResponse, http::StatusCode, test as atest, web};

    use super::key_matches;
    use crate::internal_middleware;

    async fn ok() -> HttpResponse {
        HttpResponse::Created().finish()
    }

    #[test]
    fn key_must_match_exactly() {
        assert!(key_matches("s3cret", "s3cret"));
        assert!(!key_matches("s3cre", "s3cret"));
        assert!(!key_matches("s3cret!", "s3cret"));
        assert!(!key_matches("S3CRET", "s3cret"));
        assert!(!key_matches("", ""));
    }

    #[actix_web::test]
    async fn only_matching_key_passes() {
        let app = atest::init_service(
            App::new().service(
                web::scope("/internal")
                    .wrap(internal_middleware("s3cret"))
                    .route("/users", web::post().to(ok)),
            ),
        )
        .await;

        let req = atest::TestRequest::post()
            .uri("/internal/users")
            .insert_header(("X-Internal-Key", "s3cret"))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = atest::TestRequest::post()
            .uri("/internal/users")
            .insert_header(("X-Internal-Key", "guess"))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn empty_configured_key_rejects_everything() {
        let app = atest::init_service(
            App::new().service(
                web::scope("/internal")
                    .wrap(internal_middleware(""))
                    .route("/users", web::post().to(ok)),
            ),
        )
        .await;

        let req = atest::TestRequest::post()
            .uri("/internal/users")
            .insert_header(("X-Internal-Key", ""))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }
}
