// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process launching for exec-step tasks, grounded on the reference
//! shell crate's `exec/run.rs` command-spawning idiom, simplified down to a
//! single external command.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// A fully-resolved command line ready to spawn.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
}

/// Result of running a process to completion. `-1` signals a launch failure
/// rather than a process-reported exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchResult {
    pub exit_code: i32,
    pub launch_error: Option<String>,
}

impl LaunchResult {
    pub fn launch_failed(message: impl Into<String>) -> Self {
        Self { exit_code: -1, launch_error: Some(message.into()) }
    }

    pub fn exited(code: i32) -> Self {
        Self { exit_code: code, launch_error: None }
    }
}

/// Spawns a process and waits for it to finish.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, spec: LaunchSpec) -> LaunchResult;
}

/// Real launcher backed by `tokio::process`.
#[derive(Default)]
pub struct TokioProcessLauncher;

#[async_trait]
impl ProcessLauncher for TokioProcessLauncher {
    async fn launch(&self, spec: LaunchSpec) -> LaunchResult {
        match Command::new(&spec.program).args(&spec.args).status().await {
            Ok(status) => {
                // On unix, a process killed by a signal has no exit code;
                // treat that the same as a launch failure from the caller's
                // perspective (exit code -1).
                LaunchResult::exited(status.code().unwrap_or(-1))
            }
            Err(e) => LaunchResult::launch_failed(e.to_string()),
        }
    }
}

/// Error fetching a remote executable object to a temp location.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct FetchError(pub String);

/// Downloads a remote script/binary to local disk before it can be run.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch(&self, uri: &str, sha256_checksum: Option<&str>, dest_dir: &Path) -> Result<PathBuf, FetchError>;
}

/// Fetcher that always fails; placeholder for the real remote-object client.
#[derive(Default)]
pub struct NullObjectFetcher;

#[async_trait]
impl ObjectFetcher for NullObjectFetcher {
    async fn fetch(&self, uri: &str, _sha256_checksum: Option<&str>, _dest_dir: &Path) -> Result<PathBuf, FetchError> {
        Err(FetchError(format!("no object fetcher configured for {uri}")))
    }
}

/// RAII guard that removes a fetched temp file when the exec step is done,
/// regardless of how it exits.
pub struct TempDownload {
    path: PathBuf,
}

impl TempDownload {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDownload {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn real_launcher_reports_exit_code() {
        let launcher = TokioProcessLauncher;
        let result = launcher
            .launch(LaunchSpec { program: "true".into(), args: vec![] })
            .await;
        assert_eq!(result, LaunchResult::exited(0));
    }

    #[tokio::test]
    async fn real_launcher_reports_nonzero_exit_code() {
        let launcher = TokioProcessLauncher;
        let result = launcher
            .launch(LaunchSpec { program: "false".into(), args: vec![] })
            .await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn real_launcher_reports_minus_one_on_spawn_failure() {
        let launcher = TokioProcessLauncher;
        let result = launcher
            .launch(LaunchSpec { program: "/nonexistent/binary-xyz".into(), args: vec![] })
            .await;
        assert_eq!(result.exit_code, -1);
        assert!(result.launch_error.is_some());
    }

    #[test]
    fn temp_download_removes_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.sh");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        {
            let _guard = TempDownload::new(path.clone());
            assert!(path.exists());
        }
        assert!(!path.exists());
    }
}
