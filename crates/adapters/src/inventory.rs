// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inventory collection.

use async_trait::async_trait;

/// Opaque inventory payload; the core only needs to know its checksum and
/// whether to send the full payload or a checksum-only heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub checksum: String,
    pub payload: Vec<u8>,
}

#[async_trait]
pub trait InventoryCollector: Send + Sync {
    async fn collect(&self) -> Result<Inventory, String>;
}

/// Collector that reports an empty inventory; a real collector enumerating
/// installed packages and OS metadata lives outside the core.
#[derive(Default)]
pub struct NullInventoryCollector;

#[async_trait]
impl InventoryCollector for NullInventoryCollector {
    async fn collect(&self) -> Result<Inventory, String> {
        Ok(Inventory::default())
    }
}

/// Mirrors inventory to the guest-attribute HTTP surface.
#[async_trait]
pub trait GuestAttributeSink: Send + Sync {
    async fn publish(&self, inventory: &Inventory) -> Result<(), String>;
}

#[derive(Default)]
pub struct NullGuestAttributeSink;

#[async_trait]
impl GuestAttributeSink for NullGuestAttributeSink {
    async fn publish(&self, _inventory: &Inventory) -> Result<(), String> {
        Ok(())
    }
}
