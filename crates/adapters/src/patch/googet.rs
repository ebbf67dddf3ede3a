// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Windows `GooGet` adapter. See [`super::apt`] for the scoping rationale.

use super::{binary_exists, PatchAdapter};
use async_trait::async_trait;
use tokio::process::Command;

#[derive(Default)]
pub struct GooGetAdapter;

#[async_trait]
impl PatchAdapter for GooGetAdapter {
    fn name(&self) -> &'static str {
        "googet"
    }

    fn applicable(&self) -> bool {
        cfg!(target_os = "windows") && binary_exists("googet.exe")
    }

    async fn apply_patches(&self) -> Result<(), String> {
        let out = Command::new("googet.exe")
            .args(["-noconfirm", "update"])
            .output()
            .await
            .map_err(|e| format!("googet update: {e}"))?;
        if out.status.success() {
            Ok(())
        } else {
            Err(format!("googet update exited {}: {}", out.status, String::from_utf8_lossy(&out.stderr)))
        }
    }
}
