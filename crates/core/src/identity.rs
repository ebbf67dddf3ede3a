// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance identity token source and cache.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;

/// Failure to obtain an identity token.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    /// No service account is configured — fatal, forces agent shutdown.
    #[error("no service account set")]
    NoServiceAccount,
    #[error("identity source error: {0}")]
    Source(String),
}

/// External collaborator that yields the instance identity token.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Fetch a fresh token and its expiry.
    async fn fetch(&self) -> Result<(String, DateTime<Utc>), IdentityError>;
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expiry: DateTime<Utc>,
}

/// Caches the raw token and its expiry behind a single mutual-exclusion
/// region; refreshes automatically once within 10 minutes of expiry.
pub struct TokenCache {
    source: Box<dyn IdentitySource>,
    cached: Mutex<Option<CachedToken>>,
}

const REFRESH_WINDOW: ChronoDuration = ChronoDuration::minutes(10);

impl TokenCache {
    pub fn new(source: Box<dyn IdentitySource>) -> Self {
        Self { source, cached: Mutex::new(None) }
    }

    /// Returns the cached token if it is still outside the refresh window,
    /// fetching and caching a new one otherwise.
    pub async fn token(&self, now: DateTime<Utc>) -> Result<String, IdentityError> {
        if let Some(cached) = self.cached.lock().clone() {
            if cached.expiry - now > REFRESH_WINDOW {
                return Ok(cached.token);
            }
        }
        let (token, expiry) = self.source.fetch().await?;
        *self.cached.lock() = Some(CachedToken { token: token.clone(), expiry });
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        expiry: DateTime<Utc>,
    }

    #[async_trait]
    impl IdentitySource for CountingSource {
        async fn fetch(&self) -> Result<(String, DateTime<Utc>), IdentityError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((format!("token-{n}"), self.expiry))
        }
    }

    #[tokio::test]
    async fn reuses_token_outside_refresh_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let now = Utc::now();
        let cache = TokenCache::new(Box::new(CountingSource {
            calls: calls.clone(),
            expiry: now + ChronoDuration::hours(1),
        }));
        let t1 = cache.token(now).await.unwrap();
        let t2 = cache.token(now).await.unwrap();
        assert_eq!(t1, t2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refreshes_within_ten_minutes_of_expiry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let now = Utc::now();
        let cache = TokenCache::new(Box::new(CountingSource {
            calls: calls.clone(),
            expiry: now + ChronoDuration::minutes(5),
        }));
        let _ = cache.token(now).await.unwrap();
        let _ = cache.token(now).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn surfaces_no_service_account() {
        struct Failing;
        #[async_trait]
        impl IdentitySource for Failing {
            async fn fetch(&self) -> Result<(String, DateTime<Utc>), IdentityError> {
                Err(IdentityError::NoServiceAccount)
            }
        }
        let cache = TokenCache::new(Box::new(Failing));
        let err = cache.token(Utc::now()).await.unwrap_err();
        assert!(matches!(err, IdentityError::NoServiceAccount));
    }
}
