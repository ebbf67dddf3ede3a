// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reboot primitive.

use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait RebootController: Send + Sync {
    /// The OS-reported "a reboot is pending" signal.
    fn reboot_required(&self) -> bool;

    /// Triggers the platform reboot. Real implementations never return
    /// control once the OS honors the request; callers must not rely on
    /// this future resolving.
    async fn reboot(&self) -> Result<(), String>;
}

/// Real controller: shells out to `shutdown -r` (or `shutdown /r /t 0` on
/// Windows) and then parks forever rather than returning control.
#[derive(Default)]
pub struct SystemRebootController;

#[async_trait]
impl RebootController for SystemRebootController {
    fn reboot_required(&self) -> bool {
        if cfg!(target_os = "linux") {
            std::path::Path::new("/var/run/reboot-required").exists()
        } else {
            false
        }
    }

    async fn reboot(&self) -> Result<(), String> {
        let result = if cfg!(target_os = "windows") {
            tokio::process::Command::new("shutdown").args(["/r", "/t", "0"]).status().await
        } else {
            tokio::process::Command::new("shutdown").args(["-r", "now"]).status().await
        };
        match result {
            Ok(status) if status.success() => loop {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            },
            Ok(status) => Err(format!("reboot command exited {status}")),
            Err(e) => Err(format!("failed to invoke reboot: {e}")),
        }
    }
}
