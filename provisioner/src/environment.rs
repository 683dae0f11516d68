use std::collections::BTreeMap;

use common::catalog::{PlanLimits, Region};
use db::models::server::Server;

/// Values available to `{{PLACEHOLDER}}` tokens in a variant's environment.
pub fn placeholders(server: &Server, limits: &PlanLimits, region: &Region) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("SERVER_ID", server.id.to_string()),
        ("SERVER_NAME", server.name.clone()),
        ("SERVER_MEMORY", limits.memory.to_string()),
        ("SERVER_DISK", limits.disk.to_string()),
        ("SERVER_CPU", limits.cpu.to_string()),
        ("SERVER_REGION", region.name.clone()),
    ])
}

/// Replaces every known `{{NAME}}` (or `{{ NAME }}`) token in the template values.
/// Unknown tokens are left untouched.
pub fn interpolate(
    template: &BTreeMap<String, String>,
    values: &BTreeMap<&'static str, String>,
) -> BTreeMap<String, String> {
    template
        .iter()
        .map(|(key, raw)| {
            let mut value = raw.clone();
            for (name, replacement) in values {
                value = value
                    .replace(&format!("{{{{{}}}}}", name), replacement)
                    .replace(&format!("{{{{ {} }}}}", name), replacement);
            }
            (key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_known_tokens_and_keeps_unknown_ones() {
        let template = BTreeMap::from([
            ("MOTD".to_string(), "Welcome to {{SERVER_NAME}}".to_string()),
            ("MAX_RAM".to_string(), "{{ SERVER_MEMORY }}M".to_string()),
            ("SEED".to_string(), "{{WORLD_SEED}}".to_string()),
            ("JAR".to_string(), "server.jar".to_string()),
        ]);
        let values = BTreeMap::from([
            ("SERVER_NAME", "Survival".to_string()),
            ("SERVER_MEMORY", "8192".to_string()),
        ]);

        let env = interpolate(&template, &values);
        assert_eq!(env["MOTD"], "Welcome to Survival");
        assert_eq!(env["MAX_RAM"], "8192M");
        assert_eq!(env["SEED"], "{{WORLD_SEED}}");
        assert_eq!(env["JAR"], "server.jar");
    }
}
