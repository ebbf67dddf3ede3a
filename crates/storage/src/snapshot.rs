// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic single-file JSON snapshot of the in-flight task.
//!
//! Grounded on the reference daemon's `storage/snapshot.rs` atomic
//! temp-file-then-rename idiom, simplified from its multi-generation
//! `.bak`/`.bak.N` rotation (built for a WAL-backed materialized state) down
//! to a single backup generation — this store only ever holds zero or one
//! task record, so there is nothing to roll further back through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use taskagent_core::{PatchStep, PatchTaskInstance};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

/// On-the-wire shape of the persisted patch task record, field-for-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PatchTaskDto {
    #[serde(rename = "TaskID")]
    task_id: String,
    #[serde(rename = "Task")]
    task: taskagent_core::PatchPayload,
    #[serde(rename = "StartedAt")]
    started_at: String,
    #[serde(rename = "PatchStep")]
    patch_step: PatchStep,
    #[serde(rename = "RebootCount")]
    reboot_count: u32,
}

/// On-disk document: either `{}` (no task in flight) or one patch task plus
/// its labels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(rename = "PatchTask", default, skip_serializing_if = "Option::is_none")]
    patch_task: Option<PatchTaskDto>,
    #[serde(rename = "Labels", default, skip_serializing_if = "HashMap::is_empty")]
    labels: HashMap<String, String>,
}

impl StateFile {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_patch_task(instance: &PatchTaskInstance) -> Self {
        Self {
            patch_task: Some(PatchTaskDto {
                task_id: instance.task_id.as_str().to_string(),
                task: instance.task.clone(),
                started_at: taskagent_core::time::to_rfc3339(instance.started_at),
                patch_step: instance.patch_step,
                reboot_count: instance.reboot_count,
            }),
            labels: instance.labels.clone(),
        }
    }

    pub fn into_patch_task(self) -> Result<Option<PatchTaskInstance>, SnapshotError> {
        let Some(dto) = self.patch_task else {
            return Ok(None);
        };
        Ok(Some(PatchTaskInstance {
            task_id: dto.task_id.into(),
            task: dto.task,
            started_at: taskagent_core::time::from_rfc3339(&dto.started_at)?,
            patch_step: dto.patch_step,
            reboot_count: dto.reboot_count,
            labels: self.labels,
        }))
    }
}

/// Single-reader/single-writer durable store for the in-flight task.
///
/// Callers serialize access through the task runner lock; this type
/// does no internal locking of its own.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Writes to a temp file in the same directory as the live file, then
    /// atomically renames it into place, keeping one prior generation as
    /// `.bak`.
    pub fn save(&self, state: &StateFile) -> Result<(), SnapshotError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let tmp_path = dir.join(format!(
            ".{}.tmp",
            self.path.file_name().and_then(|n| n.to_str()).unwrap_or("osconfig_task.state")
        ));
        let json = serde_json::to_vec_pretty(state)?;
        {
            let mut f = fs::File::create(&tmp_path)?;
            f.write_all(&json)?;
            f.sync_all()?;
        }
        if self.path.exists() {
            let bak = self.path.with_extension("bak");
            let _ = fs::rename(&self.path, bak);
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Returns `None` when the file is absent (a fresh host, or one that has
    /// never had a task in flight); an absent file is *not* the same as an
    /// empty `{}` document but both mean "no task in flight" to callers.
    pub fn load(&self) -> Result<Option<StateFile>, SnapshotError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn clear(&self) -> Result<(), SnapshotError> {
        self.save(&StateFile::empty())
    }
}

/// Per-OS path to the persisted state file.
pub fn default_state_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\ProgramData\Google\OSConfig\osconfig_task.state")
    } else {
        PathBuf::from("/etc/osconfig/osconfig_task.state")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;
    use taskagent_core::patch::{PatchPayload, RebootConfig};
    use tempfile::tempdir;

    fn sample_instance() -> PatchTaskInstance {
        PatchTaskInstance::new(
            "task-123".into(),
            PatchPayload {
                dry_run: false,
                pre_patch_reboot_config: RebootConfig::Default,
                post_patch_reboot_config: RebootConfig::Default,
            },
            HashMap::from([("env".to_string(), "prod".to_string())]),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn load_returns_none_when_absent() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("osconfig_task.state"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("osconfig_task.state"));
        let instance = sample_instance();
        store.save(&StateFile::from_patch_task(&instance)).unwrap();

        let loaded = store.load().unwrap().unwrap().into_patch_task().unwrap().unwrap();
        assert_eq!(loaded, instance);
    }

    #[test]
    fn clear_persists_empty_document() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("osconfig_task.state"));
        store.save(&StateFile::from_patch_task(&sample_instance())).unwrap();
        store.clear().unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.into_patch_task().unwrap().is_none());
    }

    #[test]
    fn empty_document_serializes_as_empty_json_object() {
        let json = serde_json::to_string(&StateFile::empty()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn atomic_write_keeps_one_backup_generation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("osconfig_task.state");
        let store = StateStore::new(&path);
        store.save(&StateFile::from_patch_task(&sample_instance())).unwrap();
        store.clear().unwrap();

        assert!(path.with_extension("bak").exists());
        // The live file reflects the latest save, not the backup.
        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.into_patch_task().unwrap().is_none());
    }

    #[test]
    fn save_never_leaves_a_torn_file_visible() {
        // Regression-style check: the temp path used during save is never
        // the live path, so a reader racing the writer (single-writer
        // discipline aside) can never observe partial JSON.
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("osconfig_task.state"));
        store.save(&StateFile::from_patch_task(&sample_instance())).unwrap();
        std::thread::sleep(Duration::from_millis(1));
        assert!(store.load().unwrap().is_some());
    }
}
