// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source of the project- and instance-scope metadata attribute maps that
//! [`taskagent_core::config::AgentConfig::resolve`] consumes, plus the
//! instance's zone for `{zone}` endpoint substitution. The real
//! metadata-server plumbing is out of scope for the core; this trait
//! is the seam the daemon's config-reload loop calls through.

use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn zone(&self) -> Result<String, String>;
    async fn project_attributes(&self) -> Result<HashMap<String, String>, String>;
    async fn instance_attributes(&self) -> Result<HashMap<String, String>, String>;
}

/// No metadata server reachable; every call fails. Pairs with
/// [`crate::identity::NullIdentitySource`] as the default before a real
/// environment-specific adapter is wired in.
#[derive(Default)]
pub struct NullMetadataSource;

#[async_trait]
impl MetadataSource for NullMetadataSource {
    async fn zone(&self) -> Result<String, String> {
        Err("no metadata source configured".to_string())
    }

    async fn project_attributes(&self) -> Result<HashMap<String, String>, String> {
        Err("no metadata source configured".to_string())
    }

    async fn instance_attributes(&self) -> Result<HashMap<String, String>, String> {
        Err("no metadata source configured".to_string())
    }
}

/// Fixed attribute maps and zone, for tests and static deployments that
/// inject configuration via environment rather than a live metadata server.
#[derive(Default)]
pub struct StaticMetadataSource {
    pub zone: String,
    pub project: HashMap<String, String>,
    pub instance: HashMap<String, String>,
}

#[async_trait]
impl MetadataSource for StaticMetadataSource {
    async fn zone(&self) -> Result<String, String> {
        Ok(self.zone.clone())
    }

    async fn project_attributes(&self) -> Result<HashMap<String, String>, String> {
        Ok(self.project.clone())
    }

    async fn instance_attributes(&self) -> Result<HashMap<String, String>, String> {
        Ok(self.instance.clone())
    }
}
