// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration resolved from metadata attributes.

use std::collections::HashMap;
use std::time::Duration;

/// A single recognized flag, in both its legacy (`os-*`) and current
/// (`osconfig-*`) spellings. The current spelling wins when both are set.
struct FlagKey {
    legacy: &'static str,
    current: &'static str,
}

const ENDPOINT: FlagKey = FlagKey { legacy: "os-endpoint", current: "osconfig-endpoint" };
const POLL_INTERVAL: FlagKey =
    FlagKey { legacy: "os-poll-interval", current: "osconfig-poll-interval" };
const DEBUG: FlagKey = FlagKey { legacy: "os-debug-enabled", current: "osconfig-debug-enabled" };
const DISABLED_FEATURES: FlagKey =
    FlagKey { legacy: "os-disabled-features", current: "osconfig-disabled-features" };
const INVENTORY_ENABLED: FlagKey =
    FlagKey { legacy: "os-inventory-enabled", current: "osconfig-inventory-enabled" };
const TASK_NOTIFICATION_ENABLED: FlagKey = FlagKey {
    legacy: "os-task-notification-enabled",
    current: "osconfig-task-notification-enabled",
};
const GUEST_POLICIES_ENABLED: FlagKey = FlagKey {
    legacy: "os-guest-policies-enabled",
    current: "osconfig-guest-policies-enabled",
};

fn resolve<'a>(project: &'a HashMap<String, String>, instance: &'a HashMap<String, String>, key: &FlagKey) -> Option<&'a str> {
    // Current spelling wins over legacy; instance scope wins over project.
    instance
        .get(key.current)
        .or_else(|| instance.get(key.legacy))
        .or_else(|| project.get(key.current))
        .or_else(|| project.get(key.legacy))
        .map(String::as_str)
}

/// Resolved agent configuration: service endpoint, poll cadence, and feature
/// flags, with instance-scope metadata overriding project-scope metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub endpoint: String,
    pub poll_interval: Duration,
    pub debug: bool,
    pub disabled_features: Vec<String>,
    pub os_inventory_enabled: bool,
    pub task_notification_enabled: bool,
    pub guest_policies_enabled: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: "osconfig.googleapis.com:443".to_string(),
            poll_interval: Duration::from_secs(600),
            debug: false,
            disabled_features: Vec::new(),
            os_inventory_enabled: true,
            task_notification_enabled: true,
            guest_policies_enabled: true,
        }
    }
}

impl AgentConfig {
    /// Resolve from raw project- and instance-scope metadata maps, with
    /// `{zone}` substitution on the endpoint.
    pub fn resolve(
        project: &HashMap<String, String>,
        instance: &HashMap<String, String>,
        zone: &str,
    ) -> Self {
        let mut cfg = Self::default();

        if let Some(endpoint) = resolve(project, instance, &ENDPOINT) {
            cfg.endpoint = endpoint.replace("{zone}", zone);
        }
        if let Some(v) = resolve(project, instance, &POLL_INTERVAL).and_then(|s| s.parse().ok()) {
            cfg.poll_interval = Duration::from_secs(v);
        }
        if let Some(v) = resolve(project, instance, &DEBUG) {
            cfg.debug = parse_bool(v);
        }
        if let Some(v) = resolve(project, instance, &DISABLED_FEATURES) {
            cfg.disabled_features =
                v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect();
        }
        if let Some(v) = resolve(project, instance, &INVENTORY_ENABLED) {
            cfg.os_inventory_enabled = parse_bool(v);
        }
        if let Some(v) = resolve(project, instance, &TASK_NOTIFICATION_ENABLED) {
            cfg.task_notification_enabled = parse_bool(v);
        }
        if let Some(v) = resolve(project, instance, &GUEST_POLICIES_ENABLED) {
            cfg.guest_policies_enabled = parse_bool(v);
        }

        cfg
    }

    pub fn feature_disabled(&self, name: &str) -> bool {
        self.disabled_features.iter().any(|f| f == name)
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let cfg = AgentConfig::resolve(&HashMap::new(), &HashMap::new(), "us-central1-a");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn current_spelling_wins_over_legacy() {
        let project = map(&[("os-debug-enabled", "true"), ("osconfig-debug-enabled", "false")]);
        let cfg = AgentConfig::resolve(&project, &HashMap::new(), "z");
        assert!(!cfg.debug);
    }

    #[test]
    fn instance_scope_wins_over_project_scope() {
        let project = map(&[("osconfig-debug-enabled", "false")]);
        let instance = map(&[("osconfig-debug-enabled", "true")]);
        let cfg = AgentConfig::resolve(&project, &instance, "z");
        assert!(cfg.debug);
    }

    #[test]
    fn endpoint_substitutes_zone() {
        let instance = map(&[("osconfig-endpoint", "osconfig.{zone}.example.com:443")]);
        let cfg = AgentConfig::resolve(&HashMap::new(), &instance, "us-east1-b");
        assert_eq!(cfg.endpoint, "osconfig.us-east1-b.example.com:443");
    }

    #[test]
    fn disabled_features_parsed_as_list() {
        let instance = map(&[("osconfig-disabled-features", "tasks, inventory")]);
        let cfg = AgentConfig::resolve(&HashMap::new(), &instance, "z");
        assert!(cfg.feature_disabled("tasks"));
        assert!(cfg.feature_disabled("inventory"));
        assert!(!cfg.feature_disabled("guest-policies"));
    }
}
