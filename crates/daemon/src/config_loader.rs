// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves [`AgentConfig`](taskagent_core::AgentConfig) from a
//! [`MetadataSource`] at startup. The core only ever sees the resolved
//! value; this module is the seam between it and whatever environment the
//! daemon actually runs in.

use taskagent_adapters::metadata::MetadataSource;
use taskagent_core::AgentConfig;

/// Fetches the zone plus project- and instance-scope attribute maps and
/// folds them into a resolved [`AgentConfig`]. A metadata-source failure on
/// any one of the three calls falls back to the corresponding empty/default
/// input rather than aborting startup — a host that can reach the control
/// plane at all should still get the hard-coded defaults.
pub async fn load(source: &dyn MetadataSource) -> AgentConfig {
    let zone = source.zone().await.unwrap_or_default();
    let project = source.project_attributes().await.unwrap_or_default();
    let instance = source.instance_attributes().await.unwrap_or_default();
    AgentConfig::resolve(&project, &instance, &zone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use taskagent_adapters::metadata::{NullMetadataSource, StaticMetadataSource};

    #[tokio::test]
    async fn falls_back_to_defaults_when_source_unreachable() {
        let cfg = load(&NullMetadataSource).await;
        assert_eq!(cfg, AgentConfig::default());
    }

    #[tokio::test]
    async fn resolves_from_static_source() {
        let mut instance = HashMap::new();
        instance.insert("osconfig-debug-enabled".to_string(), "true".to_string());
        let source = StaticMetadataSource { zone: "us-central1-a".to_string(), project: HashMap::new(), instance };
        let cfg = load(&source).await;
        assert!(cfg.debug);
    }
}
