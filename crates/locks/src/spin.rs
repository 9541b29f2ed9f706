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

//! Spin-wait lock: busy-poll acquisition over bare key presence.
//!
//! ## Contract (deliberately weak)
//! - `acquire` polls set-if-absent on a fixed interval until it succeeds;
//!   there is no timeout and no fairness, so a busy waiter can be starved
//!   indefinitely under sustained contention.
//! - There is **no ownership token**: the key carries a fixed sentinel, so
//!   `release` deletes whatever is there, including another holder's lock.
//! - With a TTL shorter than the critical section, the key can expire while
//!   the holder is still inside it and a second caller acquires the "same"
//!   lock concurrently.
//!
//! This is the known-unsafe primitive of the pair; see
//! [`LeasedLock`](crate::LeasedLock) for the owned variant.

use crate::{LockResult, LockStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{instrument, trace};

/// Value stored under a spin-held key. Presence is the exclusion signal;
/// the content is never inspected.
const SPIN_SENTINEL: &str = "locked";

/// Default sleep between acquisition attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Busy-poll lock over a shared key store.
#[derive(Clone)]
pub struct SpinLock {
    store: Arc<dyn LockStore>,
    poll_interval: Duration,
    ttl: Option<Duration>,
}

impl SpinLock {
    /// Create a spin lock with the default poll interval and no TTL.
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self {
            store,
            poll_interval: DEFAULT_POLL_INTERVAL,
            ttl: None,
        }
    }

    /// Set the sleep between acquisition attempts.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Attach a TTL to the lock key.
    ///
    /// A TTL bounds how long a crashed holder blocks others, but a TTL
    /// shorter than the critical section lets a second caller in while the
    /// first is still working.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Acquire the lock, polling until the key can be set.
    ///
    /// Loops without bound: returns only once acquisition succeeds or the
    /// backend fails.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn acquire(&self, key: &str) -> LockResult<()> {
        loop {
            if self.store.set_if_absent(key, SPIN_SENTINEL, self.ttl).await? {
                trace!("spin lock acquired");
                return Ok(());
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Release the lock by deleting the key, whoever holds it.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn release(&self, key: &str) -> LockResult<()> {
        self.store.delete(key).await
    }
}
