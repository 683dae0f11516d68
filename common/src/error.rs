use actix_web::HttpResponse;
use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

/// Appended to every user-facing message of an internal failure.
pub const SUPPORT_HINT: &str = "Please try again or contact support.";

#[derive(Error, Debug)]
pub enum AppError {
    // === CONVERSION ERRORS ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    JWT(#[from] jsonwebtoken::errors::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Stripe error: {0}")]
    Stripe(#[from] stripe::StripeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === APPLICATION ERRORS ===
    #[error("Authorization error: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource conflict: {0}")]
    Conflict(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Panel error ({status}): {message}")]
    Panel { status: u16, message: String },

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn panel(status: u16, message: impl Into<String>) -> Self {
        AppError::Panel {
            status,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
            || matches!(self, AppError::Database(sqlx::Error::RowNotFound))
            || matches!(self, AppError::Panel { status: 404, .. })
    }

    pub fn to_http_response(&self) -> HttpResponse {
        let is_dev = cfg!(debug_assertions);

        let to_internal_json = |err_msg: &str| {
            if is_dev {
                serde_json::json!({ "error": err_msg, "hint": SUPPORT_HINT })
            } else {
                serde_json::json!({ "error": "Internal server error", "hint": SUPPORT_HINT })
            }
        };

        match self {
            // === CONVERSION ERRORS ===
            AppError::Database(sqlx::Error::RowNotFound) => HttpResponse::NotFound()
                .json(serde_json::json!({ "error": "Resource not found" })),
            AppError::Database(error) => {
                log::error!("Database error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }
            AppError::JWT(error) => {
                log::warn!("JWT error: {}", error);
                HttpResponse::Unauthorized().json(serde_json::json!({ "error": "Invalid token" }))
            }
            AppError::Reqwest(error) => {
                log::error!("Reqwest error: {}", error);
                HttpResponse::BadGateway().json(to_internal_json(&error.to_string()))
            }
            AppError::Stripe(error) => {
                log::error!("Stripe error: {}", error);
                HttpResponse::BadGateway().json(to_internal_json(&error.to_string()))
            }
            AppError::Json(error) => {
                HttpResponse::BadRequest().json(serde_json::json!({ "error": error.to_string() }))
            }

            // === APPLICATION ERRORS ===
            AppError::Unauthorized(_) => {
                HttpResponse::Unauthorized().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::Forbidden(_) => {
                HttpResponse::Forbidden().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::NotFound(_) => {
                HttpResponse::NotFound().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::BadRequest(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::Conflict(_) => {
                HttpResponse::Conflict().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::TooManyRequests(_) => HttpResponse::TooManyRequests()
                .json(serde_json::json!({ "error": self.to_string() })),

            AppError::Config(error) => {
                log::error!("Configuration error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(error))
            }
            AppError::Panel { status, message } => {
                log::error!("Panel error ({}): {}", status, message);
                HttpResponse::BadGateway().json(to_internal_json(message))
            }
            AppError::Internal(error) => {
                log::error!("Internal error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(error))
            }
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn maps_application_errors_to_status_codes() {
        let cases = [
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::panel(500, "boom"), StatusCode::BAD_GATEWAY),
            (AppError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_http_response().status(), expected, "{err}");
        }
    }

    #[test]
    fn row_not_found_and_panel_404_count_as_not_found() {
        assert!(AppError::Database(sqlx::Error::RowNotFound).is_not_found());
        assert!(AppError::panel(404, "gone").is_not_found());
        assert!(!AppError::panel(422, "invalid").is_not_found());
    }
}
