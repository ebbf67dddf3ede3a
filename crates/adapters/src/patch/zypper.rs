// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SUSE `zypper` adapter. See [`super::apt`] for the scoping rationale.

use super::{binary_exists, PatchAdapter};
use async_trait::async_trait;
use tokio::process::Command;

#[derive(Default)]
pub struct ZypperAdapter;

#[async_trait]
impl PatchAdapter for ZypperAdapter {
    fn name(&self) -> &'static str {
        "zypper"
    }

    fn applicable(&self) -> bool {
        cfg!(target_os = "linux") && binary_exists("zypper")
    }

    async fn apply_patches(&self) -> Result<(), String> {
        let out = Command::new("zypper")
            .args(["--non-interactive", "patch"])
            .output()
            .await
            .map_err(|e| format!("zypper patch: {e}"))?;
        if out.status.success() {
            Ok(())
        } else {
            Err(format!("zypper patch exited {}: {}", out.status, String::from_utf8_lossy(&out.stderr)))
        }
    }
}
