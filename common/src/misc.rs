use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{
    Decode, Encode, Postgres, Type,
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
};

use crate::error::AppError;

/// Generates `as_str`, `Display`, `FromStr` and the sqlx TEXT mapping for a
/// string-backed status enum.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(AppError::BadRequest(format!(
                        "Invalid {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <str as Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <str as Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let text = <&str as Decode<Postgres>>::decode(value)?;
                text.parse::<$name>().map_err(|e| e.to_string().into())
            }
        }

        impl<'q> Encode<'q, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

/// Lifecycle of a purchased server, driven by the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    Pending,
    Active,
    Suspended,
    Cancelled,
}
text_enum!(ServerStatus {
    Pending => "pending",
    Active => "active",
    Suspended => "suspended",
    Cancelled => "cancelled",
});

/// Progress of the panel-side resource creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStatus {
    Unprovisioned,
    Provisioning,
    Provisioned,
    Failed,
}
text_enum!(ProvisionStatus {
    Unprovisioned => "unprovisioned",
    Provisioning => "provisioning",
    Provisioned => "provisioned",
    Failed => "failed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}
text_enum!(BillingCycle {
    Monthly => "monthly",
    Yearly => "yearly",
});

impl BillingCycle {
    /// Maps a Stripe recurring interval (`month`, `year`) to a cycle.
    pub fn from_interval(interval: &str) -> Option<Self> {
        match interval {
            "month" => Some(BillingCycle::Monthly),
            "year" => Some(BillingCycle::Yearly),
            _ => None,
        }
    }
}

/// Idempotency key shared with the panel for one server.
pub fn server_external_id(server_id: i64) -> String {
    format!("quark:server:{}", server_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_round_trip_through_text() {
        for status in [
            ServerStatus::Pending,
            ServerStatus::Active,
            ServerStatus::Suspended,
            ServerStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<ServerStatus>().unwrap(), status);
        }
        assert_eq!(
            "failed".parse::<ProvisionStatus>().unwrap(),
            ProvisionStatus::Failed
        );
    }

    #[test]
    fn unknown_text_is_rejected() {
        assert!("weekly".parse::<BillingCycle>().is_err());
    }

    #[test]
    fn stripe_intervals_map_to_cycles() {
        assert_eq!(BillingCycle::from_interval("year"), Some(BillingCycle::Yearly));
        assert_eq!(BillingCycle::from_interval("month"), Some(BillingCycle::Monthly));
        assert_eq!(BillingCycle::from_interval("week"), None);
    }

    #[test]
    fn external_id_format() {
        assert_eq!(server_external_id(42), "quark:server:42");
    }
}
