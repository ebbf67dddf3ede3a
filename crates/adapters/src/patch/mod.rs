// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Package-manager adapters.

mod apt;
mod googet;
mod wua;
mod yum;
mod zypper;

pub use apt::AptAdapter;
pub use googet::GooGetAdapter;
pub use wua::WuaAdapter;
pub use yum::YumAdapter;
pub use zypper::ZypperAdapter;

use async_trait::async_trait;

/// Best-effort PATH scan, used by each adapter's `applicable()`.
pub(crate) fn binary_exists(name: &str) -> bool {
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| dir.join(name).is_file())
}

/// One package-manager backend. `applicable` lets the fixed dispatch order
/// skip managers that aren't present on this host without treating
/// that as an error.
#[async_trait]
pub trait PatchAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn applicable(&self) -> bool;

    async fn apply_patches(&self) -> Result<(), String>;
}

/// Fixed dispatch order: APT, YUM, Zypper, GooGet, WUA.
pub fn default_adapters() -> Vec<Box<dyn PatchAdapter>> {
    vec![
        Box::new(AptAdapter::default()),
        Box::new(YumAdapter::default()),
        Box::new(ZypperAdapter::default()),
        Box::new(GooGetAdapter::default()),
        Box::new(WuaAdapter::default()),
    ]
}

/// Runs every applicable adapter in order, collecting per-adapter errors.
///
/// Errors are joined with `", \n"` rather than short-circuiting, so one
/// unavailable package manager doesn't hide a genuine failure from another.
pub async fn apply_patches(adapters: &[Box<dyn PatchAdapter>]) -> Result<(), String> {
    let mut errors = Vec::new();
    for adapter in adapters {
        if !adapter.applicable() {
            continue;
        }
        if let Err(e) = adapter.apply_patches().await {
            errors.push(format!("{}: {}", adapter.name(), e));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join(",\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        name: &'static str,
        applicable: bool,
        result: Result<(), String>,
    }

    #[async_trait]
    impl PatchAdapter for Stub {
        fn name(&self) -> &'static str {
            self.name
        }

        fn applicable(&self) -> bool {
            self.applicable
        }

        async fn apply_patches(&self) -> Result<(), String> {
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn skips_inapplicable_adapters() {
        let adapters: Vec<Box<dyn PatchAdapter>> =
            vec![Box::new(Stub { name: "apt", applicable: false, result: Err("boom".into()) })];
        assert!(apply_patches(&adapters).await.is_ok());
    }

    #[tokio::test]
    async fn joins_errors_from_multiple_adapters() {
        let adapters: Vec<Box<dyn PatchAdapter>> = vec![
            Box::new(Stub { name: "apt", applicable: true, result: Err("a".into()) }),
            Box::new(Stub { name: "yum", applicable: true, result: Err("b".into()) }),
        ];
        let err = apply_patches(&adapters).await.unwrap_err();
        assert_eq!(err, "apt: a,\nyum: b");
    }

    #[tokio::test]
    async fn succeeds_when_every_applicable_adapter_succeeds() {
        let adapters: Vec<Box<dyn PatchAdapter>> = vec![
            Box::new(Stub { name: "apt", applicable: true, result: Ok(()) }),
            Box::new(Stub { name: "yum", applicable: false, result: Err("unused".into()) }),
        ];
        assert!(apply_patches(&adapters).await.is_ok());
    }
}
