// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The OSPolicy / Resource compliance model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Whether a policy's non-compliant resources should be enforced or only
/// reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OSPolicyMode {
    Validation,
    Enforcement,
}

/// An ordered collection of resources evaluated together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OSPolicy {
    pub id: String,
    pub mode: OSPolicyMode,
    pub resource_ids: Vec<String>,
}

/// One of the four phases a resource passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigStepKind {
    Validation,
    DesiredStateCheck,
    DesiredStateEnforcement,
    DesiredStateCheckPostEnforcement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigStepOutcome {
    Succeeded,
    Failed,
}

/// Record of one phase having run against a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigStep {
    pub kind: ConfigStepKind,
    pub outcome: ConfigStepOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConfigStep {
    pub fn ok(kind: ConfigStepKind) -> Self {
        Self { kind, outcome: ConfigStepOutcome::Succeeded, error: None }
    }

    pub fn failed(kind: ConfigStepKind, error: impl Into<String>) -> Self {
        Self { kind, outcome: ConfigStepOutcome::Failed, error: Some(error.into()) }
    }
}

/// Overall compliance verdict for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceState {
    #[default]
    Unknown,
    Compliant,
    NonCompliant,
}

/// Per-resource result: a growing ordered list of [`ConfigStep`]s plus the
/// overall verdict.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResourceCompliance {
    pub resource_id: String,
    pub steps: Vec<ConfigStep>,
    pub state: ComplianceState,
}

impl ResourceCompliance {
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self { resource_id: resource_id.into(), steps: Vec::new(), state: ComplianceState::Unknown }
    }

    pub fn push(&mut self, step: ConfigStep) {
        self.steps.push(step);
    }

    pub fn has_failed_step(&self) -> bool {
        self.steps.iter().any(|s| s.outcome == ConfigStepOutcome::Failed)
    }
}

/// Error surfaced by a resource's capability methods; always scoped to that
/// resource.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ResourceError(pub String);

impl From<std::io::Error> for ResourceError {
    fn from(e: std::io::Error) -> Self {
        ResourceError(e.to_string())
    }
}

/// The six-method capability set every config resource kind implements.
///
/// A single behavior-set, not an inheritance hierarchy:
/// resource *kinds* (package, file, repository, service, ...) provide this
/// trait directly rather than subclassing a base resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    fn id(&self) -> &str;

    /// Structural/permission validation before any state is inspected.
    async fn validate(&self) -> Result<(), ResourceError>;

    /// Inspect current state; must be called before `in_desired_state`.
    async fn check_state(&self) -> Result<(), ResourceError>;

    /// Compare the last-checked state against the declared desired state.
    fn in_desired_state(&self) -> bool;

    /// Mutate the host to match the declared desired state.
    async fn enforce_state(&self) -> Result<(), ResourceError>;

    /// External entities (files, packages, services, repos) this resource
    /// claims authority over; used by callers for conflict detection.
    fn managed_resources(&self) -> Vec<String>;

    /// Best-effort teardown of any handles the resource opened. Errors are
    /// logged and swallowed by the caller.
    async fn cleanup(&self);
}
