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

//! The decrement facade: one `decrease` entry point, four exclusion
//! disciplines behind it.

use crate::config::{ms, LockingStrategy};
use invlock_locks::{LeasedLock, LockStore, SpinLock};
use invlock_stock::{Stock, StockError, StockResult, StockStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{instrument, warn};

/// Result of a decrement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecrementOutcome {
    /// The decrement was applied; carries the stock row after the write.
    Applied(Stock),
    /// The leased strategy's wait timeout elapsed; the operation was skipped
    /// and the stock untouched. Only the leased strategy produces this.
    Skipped,
}

impl DecrementOutcome {
    /// The stock row after an applied decrement, `None` if skipped.
    pub fn stock(&self) -> Option<&Stock> {
        match self {
            Self::Applied(stock) => Some(stock),
            Self::Skipped => None,
        }
    }

    /// Whether the operation was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

enum Strategy {
    Pessimistic,
    OptimisticRetry {
        backoff: Duration,
    },
    Spin(SpinLock),
    Leased {
        lock: LeasedLock,
        wait_timeout: Duration,
        lease_time: Duration,
    },
}

/// Orchestrator wrapping a locking strategy around the stock decrement.
///
/// The lock (if the strategy uses one) is released on every exit path: the
/// critical-section result is captured first and the release always runs,
/// with release failures logged rather than clobbering the business result.
pub struct StockFacade {
    store: Arc<dyn StockStore>,
    strategy: Strategy,
}

impl StockFacade {
    /// Create a facade over `store` using `strategy`.
    ///
    /// `lock_store` is the shared key store backing the distributed
    /// strategies; the pessimistic and optimistic strategies never touch it.
    pub fn new(
        store: Arc<dyn StockStore>,
        lock_store: Arc<dyn LockStore>,
        strategy: LockingStrategy,
    ) -> Self {
        let strategy = match strategy {
            LockingStrategy::Pessimistic => Strategy::Pessimistic,
            LockingStrategy::OptimisticRetry { backoff_ms } => Strategy::OptimisticRetry {
                backoff: ms(backoff_ms),
            },
            LockingStrategy::Spin {
                poll_interval_ms,
                ttl_ms,
            } => {
                let mut lock = SpinLock::new(lock_store).with_poll_interval(ms(poll_interval_ms));
                if let Some(ttl_ms) = ttl_ms {
                    lock = lock.with_ttl(ms(ttl_ms));
                }
                Strategy::Spin(lock)
            }
            LockingStrategy::Leased {
                wait_timeout_ms,
                lease_time_ms,
            } => Strategy::Leased {
                lock: LeasedLock::new(lock_store),
                wait_timeout: ms(wait_timeout_ms),
                lease_time: ms(lease_time_ms),
            },
        };
        Self { store, strategy }
    }

    /// Remove `amount` units from stock `id` under the configured strategy.
    ///
    /// ## Returns
    /// - `Ok(DecrementOutcome::Applied(stock))`: decrement applied
    /// - `Ok(DecrementOutcome::Skipped)`: leased strategy only, lock wait
    ///   timed out and nothing was mutated
    /// - `Err(StockError::NotFound)`: unknown id, surfaced immediately
    /// - `Err(StockError::InsufficientStock)`: permanent, never retried
    #[instrument(skip(self), fields(id = %id, amount = amount))]
    pub async fn decrease(&self, id: &str, amount: u64) -> StockResult<DecrementOutcome> {
        match &self.strategy {
            Strategy::Pessimistic => self.decrease_pessimistic(id, amount).await,
            Strategy::OptimisticRetry { backoff } => {
                self.decrease_optimistic(id, amount, *backoff).await
            }
            Strategy::Spin(lock) => self.decrease_spin(lock, id, amount).await,
            Strategy::Leased {
                lock,
                wait_timeout,
                lease_time,
            } => {
                self.decrease_leased(lock, id, amount, *wait_timeout, *lease_time)
                    .await
            }
        }
    }

    /// Exclusive row lock for the whole read-check-write; commit releases.
    ///
    /// No version check is needed: the exclusive read already serializes
    /// writers on this id. The insufficiency failure drops the guard
    /// uncommitted, which rolls back and releases the row lock.
    async fn decrease_pessimistic(&self, id: &str, amount: u64) -> StockResult<DecrementOutcome> {
        let row = self.store.lock_exclusive(id).await?;
        let new_quantity = row.stock().checked_decrement(amount)?;
        let stock = row.commit(new_quantity).await?;
        Ok(DecrementOutcome::Applied(stock))
    }

    /// Fresh read + version-conditioned write, retried without bound.
    ///
    /// Never blocks the row; under sustained contention this loop can retry
    /// indefinitely. `InsufficientStock` is permanent and fails immediately,
    /// on the first read or any retry's re-read.
    async fn decrease_optimistic(
        &self,
        id: &str,
        amount: u64,
        backoff: Duration,
    ) -> StockResult<DecrementOutcome> {
        loop {
            let snapshot = self.store.get(id).await?;
            let new_quantity = snapshot.checked_decrement(amount)?;
            match self
                .store
                .write_conditional(id, new_quantity, snapshot.version)
                .await
            {
                Ok(stock) => return Ok(DecrementOutcome::Applied(stock)),
                Err(StockError::VersionConflict { .. }) => {
                    sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Spin lock around a direct read-check-write.
    async fn decrease_spin(
        &self,
        lock: &SpinLock,
        id: &str,
        amount: u64,
    ) -> StockResult<DecrementOutcome> {
        lock.acquire(id)
            .await
            .map_err(|e| StockError::BackendError(e.to_string()))?;

        let result = self.decrease_while_locked(id, amount).await;

        if let Err(e) = lock.release(id).await {
            warn!(id = %id, error = %e, "spin lock release failed");
        }
        result
    }

    /// Leased lock around a direct read-check-write; wait timeout skips.
    async fn decrease_leased(
        &self,
        lock: &LeasedLock,
        id: &str,
        amount: u64,
        wait_timeout: Duration,
        lease_time: Duration,
    ) -> StockResult<DecrementOutcome> {
        let lease = lock
            .acquire(id, wait_timeout, lease_time)
            .await
            .map_err(|e| StockError::BackendError(e.to_string()))?;

        let Some(lease) = lease else {
            // Preserved asymmetry: a missed lock skips the decrement with a
            // log line instead of an error.
            warn!(id = %id, "lock wait timed out, decrement skipped");
            return Ok(DecrementOutcome::Skipped);
        };

        let result = self.decrease_while_locked(id, amount).await;

        if let Err(e) = lease.release().await {
            warn!(id = %id, error = %e, "lease release failed");
        }
        result
    }

    /// The critical section shared by the distributed strategies: read,
    /// check, write directly. Correct only while the caller holds the
    /// external lock.
    async fn decrease_while_locked(&self, id: &str, amount: u64) -> StockResult<DecrementOutcome> {
        let snapshot = self.store.get(id).await?;
        let new_quantity = snapshot.checked_decrement(amount)?;
        let stock = self.store.write_direct(id, new_quantity).await?;
        Ok(DecrementOutcome::Applied(stock))
    }
}
