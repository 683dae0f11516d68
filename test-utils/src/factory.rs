//! Default records for tests. Override fields with struct update syntax:
//!
//! ```rust,ignore
//! let server = Server { id: 42, ..factory::server(user.id) };
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use common::{
    catalog::Catalog,
    misc::{BillingCycle, ProvisionStatus, ServerStatus},
};
use db::models::{server::Server, user::User};
use uuid::Uuid;

pub const DEFAULT_EMAIL: &str = "player@example.com";
pub const MONTHLY_PRICE: &str = "price_power_monthly";
pub const YEARLY_PRICE: &str = "price_power_yearly";

pub fn timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap_or_default()
}

/// A user with no Stripe customer and no panel account.
pub fn user() -> User {
    User {
        id: Uuid::new_v4(),
        email: DEFAULT_EMAIL.to_string(),
        first_name: "Pat".to_string(),
        last_name: "Doe".to_string(),
        is_admin: false,
        stripe_customer_id: None,
        pterodactyl_user_id: None,
        pterodactyl_user_uuid: None,
        address_line1: None,
        address_line2: None,
        city: None,
        postal_code: None,
        country: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

/// A freshly checked-out server on the `power` plan running Paper in `eu-central`.
pub fn server(user_id: Uuid) -> Server {
    Server {
        id: 1,
        user_id,
        name: "Survival".to_string(),
        plan: "power".to_string(),
        game: "minecraft".to_string(),
        variant: "paper".to_string(),
        region: "eu-central".to_string(),
        billing_cycle: BillingCycle::Monthly,
        pending_billing_cycle: None,
        status: ServerStatus::Pending,
        provision_status: ProvisionStatus::Unprovisioned,
        provision_error: None,
        pterodactyl_server_id: None,
        pterodactyl_server_uuid: None,
        pterodactyl_server_identifier: None,
        pterodactyl_internal_id: None,
        stripe_subscription_id: None,
        stripe_checkout_session_id: None,
        subscription_name: "server_1".to_string(),
        external_id: None,
        cancel_at_period_end: false,
        current_period_end: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub const CATALOG_JSON: &str = r#"{
    "plans": {
        "power": {
            "name": "Power",
            "limits": { "memory": 8192, "swap": 0, "disk": 40960, "io": 500, "cpu": 400 },
            "feature_limits": { "databases": 2, "allocations": 1, "backups": 3 },
            "prices": { "monthly": "price_power_monthly", "yearly": "price_power_yearly" }
        }
    },
    "games": {
        "minecraft": {
            "name": "Minecraft",
            "variants": {
                "paper": {
                    "name": "Paper",
                    "egg": 5,
                    "docker_image": "ghcr.io/pterodactyl/yolks:java_21",
                    "startup": "java -Xms128M -Xmx{{SERVER_MEMORY}}M -jar {{SERVER_JARFILE}}",
                    "environment": {
                        "SERVER_JARFILE": "server.jar",
                        "BUILD_NUMBER": "latest",
                        "MOTD": "{{SERVER_NAME}} in {{SERVER_REGION}}"
                    }
                }
            }
        }
    },
    "regions": {
        "eu-central": {
            "name": "Frankfurt",
            "locations": [1],
            "dedicated_ip": false,
            "port_range": ["25565-25665"]
        }
    }
}"#;

pub fn catalog() -> Catalog {
    Catalog::from_json(CATALOG_JSON).expect("test catalog is valid")
}
