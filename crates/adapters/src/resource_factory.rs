// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves an `OSPolicy`'s `resource_ids` into constructed [`Resource`]
//! objects. Concrete resource kinds (package, file, repository, service —
//! see the glossary's `ManagedResources` entry) are out of scope for the
//! core, the same way package-manager adapters and the reboot
//! primitive are: the compliance pipeline only needs the six-method
//! capability set, not how any particular kind implements it.

use taskagent_core::resource::{Resource, ResourceError};

pub trait ResourceFactory: Send + Sync {
    fn build(&self, resource_id: &str) -> Result<Box<dyn Resource>, ResourceError>;
}

/// No concrete resource kinds are wired up; every id fails to resolve.
/// Stands in for the real factory the same way [`crate::exec::NullObjectFetcher`]
/// stands in for a real remote-object client.
#[derive(Default)]
pub struct NullResourceFactory;

impl ResourceFactory for NullResourceFactory {
    fn build(&self, resource_id: &str) -> Result<Box<dyn Resource>, ResourceError> {
        Err(ResourceError(format!("no resource factory configured for '{resource_id}'")))
    }
}
