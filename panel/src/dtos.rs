use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `{"object": "...", "attributes": {...}}` wrapper used by every panel resource.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub attributes: T,
}

#[derive(Debug, Deserialize)]
pub struct ListEnvelope<T> {
    pub data: Vec<Envelope<T>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PanelErrors {
    #[serde(default)]
    pub errors: Vec<PanelErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct PanelErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelUser {
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPanelUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelServer {
    pub id: i64,
    pub uuid: String,
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub internal_id: Option<i64>,
    #[serde(default)]
    pub suspended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerLimits {
    pub memory: i64,
    pub swap: i64,
    pub disk: i64,
    pub io: i64,
    pub cpu: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerFeatureLimits {
    pub databases: i64,
    pub allocations: i64,
    pub backups: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerDeploy {
    pub locations: Vec<i64>,
    pub dedicated_ip: bool,
    pub port_range: Vec<String>,
}

/// Body of `POST /api/application/servers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPanelServer {
    pub name: String,
    pub user: i64,
    pub egg: i64,
    pub docker_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startup: Option<String>,
    pub environment: BTreeMap<String, String>,
    pub limits: ServerLimits,
    pub feature_limits: ServerFeatureLimits,
    pub deploy: ServerDeploy,
    pub external_id: String,
    pub start_on_completion: bool,
}

/// Builds a panel username from the email local part, restricted to the
/// characters the panel accepts, with a short suffix from the local user id.
pub fn panel_username(email: &str, user_id: Uuid) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let cleaned: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .take(24)
        .collect();
    let cleaned = cleaned.trim_matches(|c: char| !c.is_ascii_alphanumeric());
    let suffix = &user_id.simple().to_string()[..6];
    if cleaned.is_empty() {
        format!("user{}", suffix)
    } else {
        format!("{}{}", cleaned, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_strips_disallowed_characters() {
        let id = Uuid::parse_str("abcdef01-2345-6789-abcd-ef0123456789").unwrap();
        assert_eq!(panel_username("jo+hn.doe@example.com", id), "john.doeabcdef");
        assert_eq!(panel_username("__@example.com", id), "userabcdef");
    }

    #[test]
    fn startup_is_omitted_when_absent() {
        let body = NewPanelServer {
            name: "srv".into(),
            user: 1,
            egg: 5,
            docker_image: "img".into(),
            startup: None,
            environment: BTreeMap::new(),
            limits: ServerLimits { memory: 1, swap: 0, disk: 1, io: 500, cpu: 100 },
            feature_limits: ServerFeatureLimits { databases: 0, allocations: 1, backups: 0 },
            deploy: ServerDeploy { locations: vec![1], dedicated_ip: false, port_range: vec![] },
            external_id: "quark:server:1".into(),
            start_on_completion: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("startup").is_none());
        assert_eq!(json["deploy"]["locations"][0], 1);
    }
}
