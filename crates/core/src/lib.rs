// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! taskagent-core: shared entities and abstractions for the configuration agent.

pub mod macros;

pub mod config;
pub mod identity;
pub mod patch;
pub mod resource;
pub mod task;
pub mod time;

pub use time::{Clock, FakeClock, SystemClock};
pub use config::AgentConfig;
pub use identity::{IdentityError, IdentitySource, TokenCache};
pub use patch::{PatchPayload, PatchStep, PatchTaskInstance};
pub use resource::{
    ComplianceState, ConfigStep, ConfigStepKind, ConfigStepOutcome, OSPolicy, OSPolicyMode,
    Resource, ResourceCompliance,
};
pub use task::{Task, TaskId, TaskType};
