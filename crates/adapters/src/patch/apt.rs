// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debian/Ubuntu `apt-get` adapter.
//!
//! The output parsing a real agent would need (per-package result codes,
//! held-back packages, etc.) is explicitly out of scope for the core;
//! this adapter only reports whether the invocation as a whole succeeded.

use super::{binary_exists, PatchAdapter};
use async_trait::async_trait;
use tokio::process::Command;

#[derive(Default)]
pub struct AptAdapter;

#[async_trait]
impl PatchAdapter for AptAdapter {
    fn name(&self) -> &'static str {
        "apt"
    }

    fn applicable(&self) -> bool {
        cfg!(target_os = "linux") && binary_exists("apt-get")
    }

    async fn apply_patches(&self) -> Result<(), String> {
        let update = Command::new("apt-get")
            .args(["update"])
            .output()
            .await
            .map_err(|e| format!("apt-get update: {e}"))?;
        if !update.status.success() {
            return Err(format!(
                "apt-get update exited {}: {}",
                update.status,
                String::from_utf8_lossy(&update.stderr)
            ));
        }

        let upgrade = Command::new("apt-get")
            .args(["-y", "upgrade"])
            .env("DEBIAN_FRONTEND", "noninteractive")
            .output()
            .await
            .map_err(|e| format!("apt-get upgrade: {e}"))?;
        if upgrade.status.success() {
            Ok(())
        } else {
            Err(format!(
                "apt-get upgrade exited {}: {}",
                upgrade.status,
                String::from_utf8_lossy(&upgrade.stderr)
            ))
        }
    }
}
