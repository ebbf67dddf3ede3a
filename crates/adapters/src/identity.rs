// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concrete [`IdentitySource`](taskagent_core::identity::IdentitySource)
//! implementations. The real metadata-server identity client is out of
//! scope for the core — only its shape (a trait the token cache
//! calls through) lives there; these stand in the way
//! [`crate::exec::NullObjectFetcher`] stands in for a real remote-object
//! client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taskagent_core::identity::{IdentityError, IdentitySource};

/// No service account is configured; every fetch is fatal.
#[derive(Default)]
pub struct NullIdentitySource;

#[async_trait]
impl IdentitySource for NullIdentitySource {
    async fn fetch(&self) -> Result<(String, DateTime<Utc>), IdentityError> {
        Err(IdentityError::NoServiceAccount)
    }
}

/// Yields a fixed token and expiry, for hosting environments (and tests)
/// where the identity token is injected directly rather than fetched from
/// a metadata server on every refresh.
pub struct StaticIdentitySource {
    token: String,
    expiry: DateTime<Utc>,
}

impl StaticIdentitySource {
    pub fn new(token: impl Into<String>, expiry: DateTime<Utc>) -> Self {
        Self { token: token.into(), expiry }
    }
}

#[async_trait]
impl IdentitySource for StaticIdentitySource {
    async fn fetch(&self) -> Result<(String, DateTime<Utc>), IdentityError> {
        Ok((self.token.clone(), self.expiry))
    }
}
