// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake adapters for engine-level tests, mirroring the reference's
//! `test-support`-gated `FakeAdapter` exports.

use crate::exec::{LaunchResult, LaunchSpec, ProcessLauncher};
use crate::inventory::{GuestAttributeSink, Inventory, InventoryCollector};
use crate::patch::PatchAdapter;
use crate::reboot::RebootController;
use crate::resource_factory::ResourceFactory;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use taskagent_core::resource::{Resource, ResourceError};

/// A patch adapter whose applicability and result are fixed at construction.
pub struct FakePatchAdapter {
    pub name: &'static str,
    pub applicable: bool,
    pub result: Mutex<Result<(), String>>,
    pub invocations: Arc<Mutex<u32>>,
}

impl FakePatchAdapter {
    pub fn applicable_ok(name: &'static str) -> Self {
        Self { name, applicable: true, result: Mutex::new(Ok(())), invocations: Arc::new(Mutex::new(0)) }
    }

    pub fn applicable_failing(name: &'static str, error: impl Into<String>) -> Self {
        Self {
            name,
            applicable: true,
            result: Mutex::new(Err(error.into())),
            invocations: Arc::new(Mutex::new(0)),
        }
    }

    pub fn inapplicable(name: &'static str) -> Self {
        Self { name, applicable: false, result: Mutex::new(Ok(())), invocations: Arc::new(Mutex::new(0)) }
    }
}

#[async_trait]
impl PatchAdapter for FakePatchAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn applicable(&self) -> bool {
        self.applicable
    }

    async fn apply_patches(&self) -> Result<(), String> {
        *self.invocations.lock() += 1;
        self.result.lock().clone()
    }
}

/// A process launcher that records every launch request and returns a
/// pre-programmed result, never spawning a real process.
#[derive(Default)]
pub struct FakeProcessLauncher {
    pub result: Mutex<LaunchResult>,
    pub launched: Mutex<Vec<LaunchSpec>>,
}

impl FakeProcessLauncher {
    pub fn returning(result: LaunchResult) -> Self {
        Self { result: Mutex::new(result), launched: Mutex::new(Vec::new()) }
    }

    pub fn was_launched(&self) -> bool {
        !self.launched.lock().is_empty()
    }
}

#[async_trait]
impl ProcessLauncher for FakeProcessLauncher {
    async fn launch(&self, spec: LaunchSpec) -> LaunchResult {
        self.launched.lock().push(spec);
        self.result.lock().clone()
    }
}

/// A reboot controller that never actually reboots; records whether it was
/// invoked so tests can assert reboot-gating behavior.
#[derive(Default)]
pub struct FakeRebootController {
    pub required: bool,
    pub invoked: Mutex<bool>,
}

impl FakeRebootController {
    pub fn new(required: bool) -> Self {
        Self { required, invoked: Mutex::new(false) }
    }

    pub fn was_invoked(&self) -> bool {
        *self.invoked.lock()
    }
}

#[async_trait]
impl RebootController for FakeRebootController {
    fn reboot_required(&self) -> bool {
        self.required
    }

    async fn reboot(&self) -> Result<(), String> {
        *self.invoked.lock() = true;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeInventoryCollector;

#[async_trait]
impl InventoryCollector for FakeInventoryCollector {
    async fn collect(&self) -> Result<Inventory, String> {
        Ok(Inventory { checksum: "fake".into(), payload: vec![] })
    }
}

#[derive(Default)]
pub struct FakeGuestAttributeSink {
    pub published: Mutex<Vec<Inventory>>,
}

#[async_trait]
impl GuestAttributeSink for FakeGuestAttributeSink {
    async fn publish(&self, inventory: &Inventory) -> Result<(), String> {
        self.published.lock().push(inventory.clone());
        Ok(())
    }
}

/// A config resource whose validate/check/enforce outcomes and desired-state
/// verdict are all fixed at construction, for driving the compliance
/// pipeline's phase transitions from tests.
pub struct FakeResource {
    pub id: String,
    pub validate_result: Result<(), String>,
    pub check_state_result: Result<(), String>,
    pub enforce_state_result: Result<(), String>,
    pub in_desired_state: Mutex<bool>,
    /// Flips `in_desired_state` to this value once `enforce_state` succeeds,
    /// so the post-enforcement check phase sees a different verdict.
    pub in_desired_state_after_enforce: bool,
    pub cleanup_called: Mutex<bool>,
}

impl FakeResource {
    pub fn compliant(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            validate_result: Ok(()),
            check_state_result: Ok(()),
            enforce_state_result: Ok(()),
            in_desired_state: Mutex::new(true),
            in_desired_state_after_enforce: true,
            cleanup_called: Mutex::new(false),
        }
    }

    pub fn non_compliant_then_fixed(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            validate_result: Ok(()),
            check_state_result: Ok(()),
            enforce_state_result: Ok(()),
            in_desired_state: Mutex::new(false),
            in_desired_state_after_enforce: true,
            cleanup_called: Mutex::new(false),
        }
    }

    pub fn failing_validation(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            validate_result: Err(error.into()),
            check_state_result: Ok(()),
            enforce_state_result: Ok(()),
            in_desired_state: Mutex::new(false),
            in_desired_state_after_enforce: false,
            cleanup_called: Mutex::new(false),
        }
    }
}

#[async_trait]
impl Resource for FakeResource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn validate(&self) -> Result<(), ResourceError> {
        self.validate_result.clone().map_err(ResourceError)
    }

    async fn check_state(&self) -> Result<(), ResourceError> {
        self.check_state_result.clone().map_err(ResourceError)
    }

    fn in_desired_state(&self) -> bool {
        *self.in_desired_state.lock()
    }

    async fn enforce_state(&self) -> Result<(), ResourceError> {
        self.enforce_state_result.clone().map_err(ResourceError)?;
        *self.in_desired_state.lock() = self.in_desired_state_after_enforce;
        Ok(())
    }

    fn managed_resources(&self) -> Vec<String> {
        vec![self.id.clone()]
    }

    async fn cleanup(&self) {
        *self.cleanup_called.lock() = true;
    }
}

/// Resolves resource ids against a fixed in-memory table, built once up
/// front by the test.
#[derive(Default)]
pub struct FakeResourceFactory {
    resources: Mutex<HashMap<String, Option<Arc<FakeResource>>>>,
}

impl FakeResourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, resource: Arc<FakeResource>) {
        self.resources.lock().insert(resource.id.clone(), Some(resource));
    }
}

/// Adapts a shared `Arc<FakeResource>` to the owned `Box<dyn Resource>`
/// the factory trait returns, so tests can keep their own handle for
/// assertions (e.g. `cleanup_called`) after the pipeline consumes its copy.
struct SharedResource(Arc<FakeResource>);

#[async_trait]
impl Resource for SharedResource {
    fn id(&self) -> &str {
        self.0.id()
    }

    async fn validate(&self) -> Result<(), ResourceError> {
        self.0.validate().await
    }

    async fn check_state(&self) -> Result<(), ResourceError> {
        self.0.check_state().await
    }

    fn in_desired_state(&self) -> bool {
        self.0.in_desired_state()
    }

    async fn enforce_state(&self) -> Result<(), ResourceError> {
        self.0.enforce_state().await
    }

    fn managed_resources(&self) -> Vec<String> {
        self.0.managed_resources()
    }

    async fn cleanup(&self) {
        self.0.cleanup().await
    }
}

impl ResourceFactory for FakeResourceFactory {
    fn build(&self, resource_id: &str) -> Result<Box<dyn Resource>, ResourceError> {
        match self.resources.lock().get(resource_id) {
            Some(Some(r)) => Ok(Box::new(SharedResource(r.clone()))),
            _ => Err(ResourceError(format!("unregistered resource '{resource_id}'"))),
        }
    }
}
