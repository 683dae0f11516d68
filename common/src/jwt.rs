use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    env_config::JwtConfig,
    error::{AppError, Res},
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub user_id: Uuid,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    pub exp: usize,
}

pub struct NewClaims {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

/// Generates JWT token based on user object and JWT configuration options
pub fn generate_jwt(new: NewClaims, config: &JwtConfig) -> Res<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.expiration_hours))
        .ok_or_else(|| AppError::Internal("JWT expiration overflow".to_string()))?
        .timestamp();

    let claims = JwtClaims {
        user_id: new.user_id,
        email: new.email,
        is_admin: new.is_admin,
        exp: expiration as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(AppError::from)
}

/// Extracts claims object from JWT token.
/// Requires JWT secret.
pub fn validate_jwt(token: &str, secret: &str) -> Res<JwtClaims> {
    let token_data = jsonwebtoken::decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
        }
    }

    #[test]
    fn generated_token_validates_with_same_secret() {
        let user_id = Uuid::new_v4();
        let token = generate_jwt(
            NewClaims {
                user_id,
                email: "player@example.com".to_string(),
                is_admin: true,
            },
            &config(),
        )
        .unwrap();

        let claims = validate_jwt(&token, "test-secret").unwrap();
        assert_eq!(claims.user_id, user_id);
        assert!(claims.is_admin);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = generate_jwt(
            NewClaims {
                user_id: Uuid::new_v4(),
                email: "player@example.com".to_string(),
                is_admin: false,
            },
            &config(),
        )
        .unwrap();

        assert!(matches!(validate_jwt(&token, "other"), Err(AppError::JWT(_))));
    }
}
