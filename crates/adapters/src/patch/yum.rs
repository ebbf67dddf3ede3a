// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RHEL/CentOS `yum` adapter. See [`super::apt`] for the scoping rationale.

use super::{binary_exists, PatchAdapter};
use async_trait::async_trait;
use tokio::process::Command;

#[derive(Default)]
pub struct YumAdapter;

#[async_trait]
impl PatchAdapter for YumAdapter {
    fn name(&self) -> &'static str {
        "yum"
    }

    fn applicable(&self) -> bool {
        cfg!(target_os = "linux") && binary_exists("yum")
    }

    async fn apply_patches(&self) -> Result<(), String> {
        let out = Command::new("yum")
            .args(["-y", "update"])
            .output()
            .await
            .map_err(|e| format!("yum update: {e}"))?;
        if out.status.success() {
            Ok(())
        } else {
            Err(format!("yum update exited {}: {}", out.status, String::from_utf8_lossy(&out.stderr)))
        }
    }
}
