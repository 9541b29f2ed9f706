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

//! Shared lock key store abstraction and in-memory backend.
//!
//! ## Purpose
//! The minimal atomic surface both lock disciplines need from shared
//! infrastructure: set-if-absent with optional TTL, delete, and two
//! value-checked operations (delete, TTL refresh) for owned leases.
//!
//! Business logic never reads this store directly; it is mutated only
//! through [`SpinLock`](crate::SpinLock) and [`LeasedLock`](crate::LeasedLock).

use crate::{LockError, LockResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Shared key-value store used for mutual exclusion.
///
/// ## Atomicity
/// Every method is a single atomic step against the backend. That is the
/// entire correctness contract the lock disciplines rely on; there is no
/// cross-call transaction.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Set `key = value` only if the key is absent (or expired).
    ///
    /// ## Returns
    /// - `Ok(true)` if the key was set (lock acquired)
    /// - `Ok(false)` if the key already exists (lock held)
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> LockResult<bool>;

    /// Current value for `key`, `None` if absent or expired.
    async fn get(&self, key: &str) -> LockResult<Option<String>>;

    /// Unconditional delete. Succeeds even if the key is absent.
    async fn delete(&self, key: &str) -> LockResult<()>;

    /// Delete `key` only if it currently holds `value`.
    ///
    /// ## Returns
    /// - `Ok(true)` if the key was deleted
    /// - `Ok(false)` if the key is absent, expired, or holds another value
    async fn delete_if_value(&self, key: &str, value: &str) -> LockResult<bool>;

    /// Extend the TTL of `key` only if it currently holds `value`.
    ///
    /// ## Returns
    /// - `Ok(true)` if the TTL was refreshed
    /// - `Ok(false)` if ownership was lost (absent, expired, or other value)
    async fn refresh_ttl(&self, key: &str, value: &str, ttl: Duration) -> LockResult<bool>;
}

/// Entry in the in-memory store with optional TTL.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: &str, ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

/// In-memory lock key store (for testing and single-process use).
///
/// Expired entries are dropped lazily on access, the same policy a TTL-less
/// scan-free cache uses; nothing observes an expired key as present.
#[derive(Clone, Default)]
pub struct InMemoryLockStore {
    data: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryLockStore {
    /// Create a new in-memory lock store.
    pub fn new() -> Self {
        Self::default()
    }

    fn validate_key(key: &str) -> LockResult<()> {
        if key.is_empty() {
            return Err(LockError::InvalidKey(key.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> LockResult<bool> {
        Self::validate_key(key)?;
        let mut data = self.data.write().await;
        match data.get(key) {
            Some(entry) if !entry.is_expired() => Ok(false),
            _ => {
                data.insert(key.to_string(), Entry::new(value, ttl));
                Ok(true)
            }
        }
    }

    async fn get(&self, key: &str) -> LockResult<Option<String>> {
        Self::validate_key(key)?;
        let data = self.data.read().await;
        match data.get(key) {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> LockResult<()> {
        Self::validate_key(key)?;
        let mut data = self.data.write().await;
        data.remove(key);
        Ok(())
    }

    async fn delete_if_value(&self, key: &str, value: &str) -> LockResult<bool> {
        Self::validate_key(key)?;
        let mut data = self.data.write().await;
        match data.get(key) {
            Some(entry) if !entry.is_expired() && entry.value == value => {
                data.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn refresh_ttl(&self, key: &str, value: &str, ttl: Duration) -> LockResult<bool> {
        Self::validate_key(key)?;
        let mut data = self.data.write().await;
        match data.get_mut(key) {
            Some(entry) if !entry.is_expired() && entry.value == value => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
