use std::{rc::Rc, time::Instant};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::StatusCode,
};
use colored::{ColoredString, Colorize};
use common::jwt::JwtClaims;
use futures::future::{LocalBoxFuture, Ready, ready};
use log::info;

/// Logs one line per request: status, method, path, duration and the
/// authenticated user when there is one.
pub struct LoggerMiddleware {
    enabled: bool,
}

impl LoggerMiddleware {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = LoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
            enabled: self.enabled,
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
    enabled: bool,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);
        if !self.enabled {
            return Box::pin(async move { srv.call(req).await });
        }

        let method = req.method().to_string();
        let path = req.path().to_string();
        let started = Instant::now();

        Box::pin(async move {
            let res = srv.call(req).await?;

            // the auth middleware runs inside this one, so claims are set by now
            let user_id = res
                .request()
                .extensions()
                .get::<JwtClaims>()
                .map(|c| c.user_id.to_string());

            info!(
                "{}",
                format_line(
                    res.status(),
                    &method,
                    &path,
                    started.elapsed().as_millis(),
                    user_id.as_deref(),
                )
            );
            Ok(res)
        })
    }
}

fn colored_status(status: StatusCode) -> ColoredString {
    let code = status.as_u16().to_string();
    match status.as_u16() {
        200..=299 => code.green(),
        300..=399 => code.yellow(),
        400..=499 => code.bright_red(),
        _ => code.red(),
    }
}

fn colored_method(method: &str) -> ColoredString {
    match method {
        "GET" => method.blue(),
        "POST" => method.yellow(),
        "PUT" | "PATCH" => method.purple(),
        "DELETE" => method.red(),
        _ => method.normal(),
    }
}

fn format_line(
    status: StatusCode,
    method: &str,
    path: &str,
    elapsed_ms: u128,
    user_id: Option<&str>,
) -> String {
    format!(
        "[{}] {} {} {} user_id={}",
        colored_status(status),
        colored_method(method),
        path.bright_white(),
        format!("({}ms)", elapsed_ms).bright_black(),
        user_id.unwrap_or("None").bright_blue(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test as atest, web};
    use uuid::Uuid;

    #[test]
    fn line_contains_request_fields() {
        colored::control::set_override(false);
        let user = Uuid::nil().to_string();
        let line = format_line(
            StatusCode::CREATED,
            "POST",
            "/api/dashboard/servers/checkout",
            12,
            Some(&user),
        );
        assert_eq!(
            line,
            format!(
                "[201] POST /api/dashboard/servers/checkout (12ms) user_id={}",
                user
            )
        );
    }

    #[actix_web::test]
    async fn passes_responses_through() {
        let app = atest::init_service(
            App::new()
                .wrap(LoggerMiddleware::new(true))
                .route("/ping", web::get().to(|| async { HttpResponse::Ok().body("pong") })),
        )
        .await;

        let res = atest::call_service(&app, atest::TestRequest::get().uri("/ping").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(atest::read_body(res).await, "pong");
    }
}
