use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of the identity service's user registration call.
#[derive(Debug, Clone, Deserialize)]
pub struct InternalUserRequest {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InternalUserResponse {
    pub user_id: Uuid,
    pub customer_id: String,
}
