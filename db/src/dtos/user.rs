use uuid::Uuid;

/// A user registered by the identity service. `id` is the identity service's
/// user id when it supplies one, so issued tokens map onto this row.
#[derive(Debug, Clone)]
pub struct UserCreateRequest {
    pub id: Option<Uuid>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub stripe_customer_id: Option<String>,
    pub address: BillingAddress,
}

#[derive(Debug, Clone, Default)]
pub struct BillingAddress {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}
