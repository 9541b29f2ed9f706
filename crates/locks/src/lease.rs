// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2026 InvLock Contributors
//
// This file is part of InvLock.
//
// InvLock is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// InvLock is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with InvLock. If not, see <https://www.gnu.org/licenses/>.

//! Leased lock: bounded-wait acquisition of an owned, auto-renewed lease.
//!
//! ## Design
//! - Acquisition polls set-if-absent under a wait deadline; a caller that
//!   does not get the lock within `wait_timeout` gets `None` back instead of
//!   an error.
//! - The lease value is a fresh ULID ownership token. Release and renewal
//!   are token-checked, so only the holder can do either.
//! - A watchdog task renews the TTL at a third of the lease time while the
//!   lease is held. If the holder process dies, renewal stops and the lease
//!   expires after `lease_time`, making it reclaimable by others.

use crate::{LockError, LockResult, LockStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument, warn};
use ulid::Ulid;

/// Default sleep between acquisition attempts while waiting.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Factory for owned leases over a shared key store.
#[derive(Clone)]
pub struct LeasedLock {
    store: Arc<dyn LockStore>,
    retry_interval: Duration,
}

impl LeasedLock {
    /// Create a leased lock with the default retry interval.
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self {
            store,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    /// Set the sleep between acquisition attempts.
    #[must_use]
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Try to acquire an owned lease on `key` within `wait_timeout`.
    ///
    /// ## Returns
    /// - `Ok(Some(lease))`: acquired; the lease renews itself until
    ///   released or dropped
    /// - `Ok(None)`: `wait_timeout` elapsed without acquisition; the caller
    ///   decides what a missed lock means (the decrement facade skips the
    ///   operation)
    #[instrument(skip(self), fields(key = %key))]
    pub async fn acquire(
        &self,
        key: &str,
        wait_timeout: Duration,
        lease_time: Duration,
    ) -> LockResult<Option<Lease>> {
        let token = Ulid::new().to_string();
        let deadline = Instant::now() + wait_timeout;

        loop {
            if self
                .store
                .set_if_absent(key, &token, Some(lease_time))
                .await?
            {
                debug!(token = %token, "lease acquired");
                return Ok(Some(Lease::start(
                    self.store.clone(),
                    key.to_string(),
                    token,
                    lease_time,
                )));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            sleep(self.retry_interval.min(deadline - now)).await;
        }
    }
}

/// A held lease: ownership token plus the watchdog renewing it.
///
/// Dropping an unreleased lease aborts the watchdog; the key then expires on
/// its own after the lease time, which is the crash-recovery path.
pub struct Lease {
    store: Arc<dyn LockStore>,
    key: String,
    token: String,
    watchdog: JoinHandle<()>,
}

impl Lease {
    fn start(store: Arc<dyn LockStore>, key: String, token: String, lease_time: Duration) -> Self {
        let watchdog = {
            let store = store.clone();
            let key = key.clone();
            let token = token.clone();
            // Renew well inside the lease window so one missed tick does not
            // lose the lock.
            let renew_interval = lease_time / 3;
            tokio::spawn(async move {
                loop {
                    sleep(renew_interval).await;
                    match store.refresh_ttl(&key, &token, lease_time).await {
                        Ok(true) => {}
                        Ok(false) => {
                            warn!(key = %key, "lease ownership lost, stopping watchdog");
                            break;
                        }
                        Err(e) => {
                            warn!(key = %key, error = %e, "lease renewal failed, stopping watchdog");
                            break;
                        }
                    }
                }
            })
        };

        Self {
            store,
            key,
            token,
            watchdog,
        }
    }

    /// Lock key this lease holds.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stop the watchdog and delete the key, token-checked.
    ///
    /// ## Returns
    /// - `Ok(())` if the lease was still owned and is now released
    /// - `Err(LockError::LeaseExpired)` if ownership was already lost
    ///   (expired or reclaimed); nothing else's key is touched
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn release(self) -> LockResult<()> {
        self.watchdog.abort();
        if self.store.delete_if_value(&self.key, &self.token).await? {
            debug!("lease released");
            Ok(())
        } else {
            Err(LockError::LeaseExpired(self.key.clone()))
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.watchdog.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryLockStore;
    use tokio::time::timeout;

    fn leased(store: &Arc<InMemoryLockStore>) -> LeasedLock {
        LeasedLock::new(store.clone() as Arc<dyn LockStore>)
            .with_retry_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let store = Arc::new(InMemoryLockStore::new());
        let lock = leased(&store);

        let lease = lock
            .acquire("item-1", Duration::from_millis(100), Duration::from_secs(1))
            .await
            .unwrap()
            .expect("uncontended acquire should succeed");
        assert!(store.get("item-1").await.unwrap().is_some());

        lease.release().await.unwrap();
        assert!(store.get("item-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_acquire_times_out_while_held() {
        let store = Arc::new(InMemoryLockStore::new());
        let lock = leased(&store);

        let _held = lock
            .acquire("item-1", Duration::from_millis(100), Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();

        let started = Instant::now();
        let second = lock
            .acquire("item-1", Duration::from_millis(60), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(second.is_none());
        // Came back around the wait deadline, not the holder's schedule.
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_acquire_succeeds_after_release() {
        let store = Arc::new(InMemoryLockStore::new());
        let lock = leased(&store);

        let held = lock
            .acquire("item-1", Duration::from_millis(100), Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();

        let contender = leased(&store);
        let waiter = tokio::spawn(async move {
            contender
                .acquire("item-1", Duration::from_secs(2), Duration::from_secs(1))
                .await
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        held.release().await.unwrap();

        let lease = timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(lease.is_some());
    }

    #[tokio::test]
    async fn test_watchdog_outlives_lease_time() {
        let store = Arc::new(InMemoryLockStore::new());
        let lock = leased(&store);

        let lease = lock
            .acquire(
                "item-1",
                Duration::from_millis(100),
                Duration::from_millis(60),
            )
            .await
            .unwrap()
            .unwrap();

        // Hold well past the lease time; the watchdog must keep it alive.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(
            store.get("item-1").await.unwrap().is_some(),
            "watchdog should have renewed the lease"
        );

        lease.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_lease_expires() {
        let store = Arc::new(InMemoryLockStore::new());
        let lock = leased(&store);

        let lease = lock
            .acquire(
                "item-1",
                Duration::from_millis(100),
                Duration::from_millis(40),
            )
            .await
            .unwrap()
            .unwrap();
        drop(lease); // holder "dies": watchdog stops, no release

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(
            store.get("item-1").await.unwrap().is_none(),
            "unrenewed lease should expire"
        );
    }

    #[tokio::test]
    async fn test_release_after_ownership_lost() {
        let store = Arc::new(InMemoryLockStore::new());
        let lock = leased(&store);

        let lease = lock
            .acquire("item-1", Duration::from_millis(100), Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();

        // Simulate an external reclaim.
        store.delete("item-1").await.unwrap();

        let result = lease.release().await;
        assert!(matches!(result, Err(LockError::LeaseExpired(_))));
    }

    #[tokio::test]
    async fn test_tokens_are_per_acquisition() {
        let store = Arc::new(InMemoryLockStore::new());
        let lock = leased(&store);

        let lease1 = lock
            .acquire("item-1", Duration::from_millis(100), Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        let token1 = store.get("item-1").await.unwrap().unwrap();
        lease1.release().await.unwrap();

        let lease2 = lock
            .acquire("item-1", Duration::from_millis(100), Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        let token2 = store.get("item-1").await.unwrap().unwrap();
        lease2.release().await.unwrap();

        assert_ne!(token1, token2);
    }
}
