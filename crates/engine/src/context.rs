//! `AgentContext`: the explicit, injected context value that replaces what
//! would otherwise be a global mutable token cache and global mutable
//! configuration. Constructed once at daemon startup and
//! threaded by `Arc` into the task runner and every state machine — never a
//! global or `lazy_static`.
//!
//! Lives in `taskagent-engine` rather than `taskagent-core` because it
//! composes the `Reporter` (this crate) and the adapter trait objects
//! (`taskagent-adapters`), both of which depend on `taskagent-core` — putting
//! it in core would create a cycle.

use crate::reporter::Reporter;
use std::sync::Arc;
use taskagent_adapters::exec::{ObjectFetcher, ProcessLauncher};
use taskagent_adapters::inventory::{GuestAttributeSink, InventoryCollector};
use taskagent_adapters::patch::PatchAdapter;
use taskagent_adapters::reboot::RebootController;
use taskagent_adapters::resource_factory::ResourceFactory;
use taskagent_core::{AgentConfig, Clock};

pub struct AgentContext<C: Clock> {
    pub clock: C,
    pub config: AgentConfig,
    pub reporter: Reporter,
    pub patch_adapters: Vec<Box<dyn PatchAdapter>>,
    pub process_launcher: Arc<dyn ProcessLauncher>,
    pub object_fetcher: Arc<dyn ObjectFetcher>,
    pub reboot_controller: Arc<dyn RebootController>,
    pub inventory_collector: Arc<dyn InventoryCollector>,
    pub guest_attribute_sink: Arc<dyn GuestAttributeSink>,
    pub resource_factory: Arc<dyn ResourceFactory>,
}

impl<C: Clock> AgentContext<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: C,
        config: AgentConfig,
        reporter: Reporter,
        patch_adapters: Vec<Box<dyn PatchAdapter>>,
        process_launcher: Arc<dyn ProcessLauncher>,
        object_fetcher: Arc<dyn ObjectFetcher>,
        reboot_controller: Arc<dyn RebootController>,
        inventory_collector: Arc<dyn InventoryCollector>,
        guest_attribute_sink: Arc<dyn GuestAttributeSink>,
        resource_factory: Arc<dyn ResourceFactory>,
    ) -> Self {
        Self {
            clock,
            config,
            reporter,
            patch_adapters,
            process_launcher,
            object_fetcher,
            reboot_controller,
            inventory_collector,
            guest_attribute_sink,
            resource_factory,
        }
    }
}
