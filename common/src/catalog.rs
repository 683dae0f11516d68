//! Static product catalog: plans with their resource limits and Stripe prices,
//! game variants with panel egg definitions, and regions with deployment targets.
//!
//! The catalog is read once at startup from a JSON file and shared read-only.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Res},
    misc::BillingCycle,
};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Catalog {
    #[serde(default)]
    pub plans: HashMap<String, Plan>,
    #[serde(default)]
    pub games: HashMap<String, Game>,
    #[serde(default)]
    pub regions: HashMap<String, Region>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Plan {
    pub name: String,
    pub limits: PlanLimits,
    pub feature_limits: FeatureLimits,
    #[serde(default)]
    pub prices: PlanPrices,
}

/// Resource limits in panel units (MiB for memory/swap/disk, percent for cpu).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlanLimits {
    pub memory: i64,
    #[serde(default)]
    pub swap: i64,
    pub disk: i64,
    #[serde(default = "default_io")]
    pub io: i64,
    pub cpu: i64,
}

fn default_io() -> i64 {
    500
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeatureLimits {
    #[serde(default)]
    pub databases: i64,
    #[serde(default = "default_allocations")]
    pub allocations: i64,
    #[serde(default)]
    pub backups: i64,
}

fn default_allocations() -> i64 {
    1
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlanPrices {
    pub monthly: Option<String>,
    pub yearly: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Game {
    pub name: String,
    pub variants: HashMap<String, Variant>,
}

/// A panel egg plus the values needed to start it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Variant {
    pub name: String,
    pub egg: i64,
    pub docker_image: String,
    #[serde(default)]
    pub startup: Option<String>,
    /// Environment template; values may contain `{{PLACEHOLDER}}` tokens.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Region {
    pub name: String,
    pub locations: Vec<i64>,
    #[serde(default)]
    pub dedicated_ip: bool,
    #[serde(default)]
    pub port_range: Vec<String>,
}

impl Catalog {
    /// Reads and parses the catalog file.
    pub fn load(path: &str) -> Res<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read catalog '{}': {}", path, e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Res<Self> {
        serde_json::from_str(raw).map_err(|e| AppError::Config(format!("Invalid catalog: {}", e)))
    }

    pub fn plan(&self, key: &str) -> Res<&Plan> {
        self.plans
            .get(key)
            .ok_or_else(|| AppError::Config(format!("unknown plan '{}'", key)))
    }

    pub fn variant(&self, game: &str, variant: &str) -> Res<&Variant> {
        let game_def = self
            .games
            .get(game)
            .ok_or_else(|| AppError::Config(format!("unknown game '{}'", game)))?;
        game_def.variants.get(variant).ok_or_else(|| {
            AppError::Config(format!("unknown variant '{}' for game '{}'", variant, game))
        })
    }

    pub fn region(&self, key: &str) -> Res<&Region> {
        self.regions
            .get(key)
            .ok_or_else(|| AppError::Config(format!("unknown region '{}'", key)))
    }

    /// Stripe price id for a plan and billing cycle.
    pub fn price_for(&self, plan: &str, cycle: BillingCycle) -> Res<&str> {
        let prices = &self.plan(plan)?.prices;
        let price = match cycle {
            BillingCycle::Monthly => prices.monthly.as_deref(),
            BillingCycle::Yearly => prices.yearly.as_deref(),
        };
        price.ok_or_else(|| {
            AppError::Config(format!("plan '{}' has no {} price", plan, cycle))
        })
    }

    /// Reverse lookup used when a webhook only carries a price id.
    pub fn plan_for_price(&self, price_id: &str) -> Option<(&str, BillingCycle)> {
        self.plans.iter().find_map(|(key, plan)| {
            if plan.prices.monthly.as_deref() == Some(price_id) {
                Some((key.as_str(), BillingCycle::Monthly))
            } else if plan.prices.yearly.as_deref() == Some(price_id) {
                Some((key.as_str(), BillingCycle::Yearly))
            } else {
                None
            }
        })
    }

    /// Checks that a checkout request names entries that exist.
    pub fn validate_selection(
        &self,
        plan: &str,
        game: &str,
        variant: &str,
        region: &str,
        cycle: BillingCycle,
    ) -> Res<()> {
        self.price_for(plan, cycle)?;
        self.variant(game, variant)?;
        self.region(region)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "plans": {
            "power": {
                "name": "Power",
                "limits": { "memory": 8192, "disk": 40960, "cpu": 400 },
                "feature_limits": { "databases": 2, "backups": 3 },
                "prices": { "monthly": "price_power_m", "yearly": "price_power_y" }
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
                        "environment": { "SERVER_JARFILE": "server.jar" }
                    }
                }
            }
        },
        "regions": {
            "eu-central": { "name": "Frankfurt", "locations": [1] }
        }
    }"#;

    #[test]
    fn resolves_entries_and_applies_defaults() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        let plan = catalog.plan("power").unwrap();
        assert_eq!(plan.limits.io, 500);
        assert_eq!(plan.feature_limits.allocations, 1);
        assert_eq!(catalog.variant("minecraft", "paper").unwrap().egg, 5);
        assert_eq!(catalog.region("eu-central").unwrap().locations, vec![1]);
    }

    #[test]
    fn missing_entries_are_config_errors() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert!(matches!(catalog.plan("tiny"), Err(AppError::Config(_))));
        assert!(matches!(
            catalog.variant("minecraft", "forge"),
            Err(AppError::Config(_))
        ));
        assert!(matches!(catalog.variant("rust", "paper"), Err(AppError::Config(_))));
        assert!(matches!(catalog.region("us-west"), Err(AppError::Config(_))));
    }

    #[test]
    fn prices_resolve_both_ways() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert_eq!(
            catalog.price_for("power", BillingCycle::Yearly).unwrap(),
            "price_power_y"
        );
        assert_eq!(
            catalog.plan_for_price("price_power_m"),
            Some(("power", BillingCycle::Monthly))
        );
        assert_eq!(catalog.plan_for_price("price_unknown"), None);
    }
}
