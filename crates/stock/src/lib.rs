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

//! # InvLock Stock Store
//!
//! ## Purpose
//! Holds the one piece of shared mutable state in InvLock: a stock counter
//! per identifier that must never be jointly overdrawn by concurrent
//! decrements. The store exposes exactly the three primitives the locking
//! strategies need:
//!
//! - a plain snapshot read ([`StockStore::get`]),
//! - an exclusive read-then-write under a per-row lock
//!   ([`StockStore::lock_exclusive`], row-lock semantics), and
//! - a version-conditioned write ([`StockStore::write_conditional`],
//!   optimistic semantics).
//!
//! ## Design Decisions
//! - **Invariant in one place**: `quantity >= 0` is enforced structurally
//!   (`u64`) and by [`Stock::checked_decrement`], the single helper every
//!   strategy uses for the insufficiency check.
//! - **Version-based optimistic writes**: `version` increments by one on
//!   every successful write and is compared-and-swapped, never decremented.
//! - **Row lock = guard lifetime**: [`StockStore::lock_exclusive`] returns a
//!   guard that holds the row lock until it is committed or dropped.
//!   Dropping without commit is rollback: no write happens and the lock is
//!   released on every exit path, including errors.
//!
//! ## Backend Support
//! - [`InMemoryStockStore`]: HashMap-based, always available. Durable
//!   backends (SQL, etc.) plug in behind the [`StockStore`] trait.
//!
//! ## Examples
//! ```rust
//! use invlock_stock::{InMemoryStockStore, StockStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStockStore::new();
//! store.create("item-1", 10).await?;
//!
//! // Pessimistic path: exclusive read, check, commit.
//! let row = store.lock_exclusive("item-1").await?;
//! let remaining = row.stock().checked_decrement(3)?;
//! let stock = row.commit(remaining).await?;
//! assert_eq!(stock.quantity, 7);
//! assert_eq!(stock.version, 1);
//!
//! // Optimistic path: snapshot read, conditioned write.
//! let snapshot = store.get("item-1").await?;
//! store
//!     .write_conditional("item-1", snapshot.quantity - 1, snapshot.version)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod memory;

pub use error::{StockError, StockResult};
pub use memory::InMemoryStockStore;

/// A stock row: the shared counter every locking strategy contends on.
///
/// ## Invariants
/// - `quantity` is non-negative by construction.
/// - `version` increases by exactly one on every successful write; it exists
///   only to support version-conditioned writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    /// Stock identifier (also reused as the lock key by distributed strategies).
    pub id: String,
    /// Units currently on hand.
    pub quantity: u64,
    /// Optimistic-locking token, bumped on every write.
    pub version: u64,
}

impl Stock {
    /// Compute the quantity after removing `amount` units.
    ///
    /// ## Returns
    /// - `Ok(new_quantity)` when enough stock is on hand
    /// - `Err(StockError::InsufficientStock)` otherwise, a permanent
    ///   condition never retried by any strategy
    pub fn checked_decrement(&self, amount: u64) -> StockResult<u64> {
        self.quantity
            .checked_sub(amount)
            .ok_or_else(|| StockError::InsufficientStock {
                id: self.id.clone(),
                requested: amount,
                available: self.quantity,
            })
    }
}

/// Exclusive hold on a single stock row.
///
/// The row lock is acquired by [`StockStore::lock_exclusive`] and held for
/// the lifetime of this guard, blocking any other exclusive reader on the
/// same id. [`commit`](ExclusiveStock::commit) writes and releases; dropping
/// the guard without committing rolls back (no write) and releases.
#[async_trait]
pub trait ExclusiveStock: Send {
    /// The row as read under the exclusive lock.
    fn stock(&self) -> &Stock;

    /// Write `new_quantity`, bump the version, and release the row lock.
    async fn commit(self: Box<Self>, new_quantity: u64) -> StockResult<Stock>;
}

/// Transactional record store holding one counter per stock identifier.
///
/// ## Design
/// Mirrors the semantics of a relational row store without binding to one:
/// `get` is a snapshot read (never blocked by an exclusive holder),
/// `lock_exclusive` is `SELECT ... FOR UPDATE`, `write_conditional` is
/// `UPDATE ... WHERE version = ?`. All writes are durable (visible to every
/// subsequent read) before the operation returns `Ok`.
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Seed a stock row. Fails with `AlreadyExists` if the id is taken.
    async fn create(&self, id: &str, quantity: u64) -> StockResult<Stock>;

    /// Snapshot read of the current committed row.
    async fn get(&self, id: &str) -> StockResult<Stock>;

    /// Acquire the exclusive per-row lock and read the row under it.
    ///
    /// Blocks until any other exclusive holder of the same id releases.
    /// Lock-grant order among blocked waiters is unspecified.
    async fn lock_exclusive(&self, id: &str) -> StockResult<Box<dyn ExclusiveStock>>;

    /// Version-conditioned write (optimistic).
    ///
    /// ## Returns
    /// - `Ok(stock)` with the new quantity and bumped version
    /// - `Err(StockError::VersionConflict)` if the stored version no longer
    ///   equals `expected_version` (no change made)
    async fn write_conditional(
        &self,
        id: &str,
        new_quantity: u64,
        expected_version: u64,
    ) -> StockResult<Stock>;

    /// Unconditional write: no version check, no row lock.
    ///
    /// Correct only inside an external critical section (spin or leased
    /// lock); the caller supplies the mutual exclusion this write skips.
    async fn write_direct(&self, id: &str, new_quantity: u64) -> StockResult<Stock>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(quantity: u64) -> Stock {
        Stock {
            id: "item".to_string(),
            quantity,
            version: 0,
        }
    }

    #[test]
    fn test_checked_decrement() {
        assert_eq!(stock(10).checked_decrement(3).unwrap(), 7);
        assert_eq!(stock(10).checked_decrement(10).unwrap(), 0);
        assert_eq!(stock(10).checked_decrement(0).unwrap(), 10);
    }

    #[test]
    fn test_checked_decrement_insufficient() {
        let result = stock(2).checked_decrement(3);
        match result {
            Err(StockError::InsufficientStock {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
    }

    #[test]
    fn test_checked_decrement_zero_stock() {
        assert!(stock(0).checked_decrement(1).is_err());
        assert_eq!(stock(0).checked_decrement(0).unwrap(), 0);
    }
}
