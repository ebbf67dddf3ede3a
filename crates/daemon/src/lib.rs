// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! taskagent-daemon: wires the coordination engine to a live gRPC channel,
//! OS-facing adapters, and the persisted task-runner loop. The binary
//! target (`src/main.rs`) is a thin process entry point over this crate.

pub mod config_loader;
pub mod notification;
