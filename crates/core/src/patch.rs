// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable record for an in-flight patch task.

use crate::task::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coarse-grained position of a patch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchStep {
    PrePatch,
    Patching,
    PostPatch,
}

crate::simple_display! {
    PatchStep {
        PrePatch => "PrePatch",
        Patching => "Patching",
        PostPatch => "PostPatch",
    }
}

impl Default for PatchStep {
    fn default() -> Self {
        PatchStep::PrePatch
    }
}

/// Reboot policy for a patch task, read from the task payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RebootConfig {
    /// Follow the OS-reported reboot-required signal.
    #[default]
    Default,
    /// Always reboot at this boundary, even without an OS signal.
    Always,
    /// Never reboot at this boundary.
    Never,
}

/// Type-specific payload for an apply-patches task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchPayload {
    pub dry_run: bool,
    pub pre_patch_reboot_config: RebootConfig,
    pub post_patch_reboot_config: RebootConfig,
}

/// Durable record for an in-flight patch task.
///
/// Invariant: exactly zero or one of these is persisted at any
/// time, enforced by `taskagent-storage`'s single-slot snapshot rather than
/// by this type itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchTaskInstance {
    pub task_id: TaskId,
    pub task: PatchPayload,
    pub started_at: DateTime<Utc>,
    pub patch_step: PatchStep,
    pub reboot_count: u32,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl PatchTaskInstance {
    pub fn new(task_id: TaskId, task: PatchPayload, labels: HashMap<String, String>, now: DateTime<Utc>) -> Self {
        Self { task_id, task, started_at: now, patch_step: PatchStep::PrePatch, reboot_count: 0, labels }
    }
}
