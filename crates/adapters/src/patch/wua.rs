// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Windows Update Agent adapter. See [`super::apt`] for the scoping
//! rationale — driving the real WUA COM API is well outside the core's
//! concern; this shells out to the `PSWindowsUpdate` module, which is the
//! same integration surface a minimal agent would reach for first.

use super::{binary_exists, PatchAdapter};
use async_trait::async_trait;
use tokio::process::Command;

#[derive(Default)]
pub struct WuaAdapter;

#[async_trait]
impl PatchAdapter for WuaAdapter {
    fn name(&self) -> &'static str {
        "wua"
    }

    fn applicable(&self) -> bool {
        cfg!(target_os = "windows") && binary_exists("powershell.exe")
    }

    async fn apply_patches(&self) -> Result<(), String> {
        let out = Command::new("powershell.exe")
            .args([
                "-NonInteractive",
                "-NoProfile",
                "-Command",
                "Install-WindowsUpdate -AcceptAll -IgnoreReboot",
            ])
            .output()
            .await
            .map_err(|e| format!("Install-WindowsUpdate: {e}"))?;
        if out.status.success() {
            Ok(())
        } else {
            Err(format!(
                "Install-WindowsUpdate exited {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr)
            ))
        }
    }
}
