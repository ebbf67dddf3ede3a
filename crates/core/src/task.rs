// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The unit of work delivered by the service.

use crate::patch::PatchPayload;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque task identifier assigned by the service.
///
/// Unlike internally-generated ids (see `oj-core`'s fixed-width `IdBuf`),
/// a task id is produced by the control plane and has no length contract
/// we can rely on, so it is a plain owned string rather than a fixed-size
/// inline buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The kind of work a task carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    ApplyPatches,
    ExecStep,
    ApplyConfig,
}

crate::simple_display! {
    TaskType {
        ApplyPatches => "APPLY_PATCHES",
        ExecStep => "EXEC_STEP_TASK",
        ApplyConfig => "APPLY_CONFIG_TASK",
    }
}

/// Type-specific payload for an exec-step task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecPayload {
    pub linux_step: Option<ExecStepConfig>,
    pub windows_step: Option<ExecStepConfig>,
}

/// Platform-specific half of an exec step: how to obtain and run the script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecStepConfig {
    pub interpreter: Interpreter,
    pub source: ExecSource,
    /// Expected to match one of a small allow-list; a mismatch fails the step
    /// before anything is executed.
    pub allowed_success_codes: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interpreter {
    Unspecified,
    Shell,
    Powershell,
}

/// Where the executable content for an exec step comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecSource {
    /// Already present on disk.
    LocalPath(String),
    /// Must be fetched (e.g. a GCS object) before it can run.
    Remote { uri: String, sha256_checksum: Option<String> },
}

/// Type-specific payload for an apply-config task: an ordered policy list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPayload {
    pub policies: Vec<crate::resource::OSPolicy>,
}

/// Per-task-type payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskPayload {
    Patch(PatchPayload),
    Exec(ExecPayload),
    Config(ConfigPayload),
}

/// A unit of work pulled from the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub task_type: TaskType,
    #[serde(default)]
    pub service_labels: HashMap<String, String>,
    pub payload: TaskPayload,
}
