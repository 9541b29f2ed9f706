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

//! # InvLock Decrement Facade
//!
//! ## Purpose
//! The orchestrator callers talk to: for a configured locking strategy,
//! [`StockFacade::decrease`] acquires the appropriate lock (if any), runs the
//! read-check-write against the stock store, and releases the lock on every
//! exit path.
//!
//! ## The four strategies
//!
//! | Strategy | Exclusion | Contention behavior |
//! |---|---|---|
//! | [`LockingStrategy::Pessimistic`] | store row lock | blocks, total order per id |
//! | [`LockingStrategy::OptimisticRetry`] | version CAS | retries forever on conflict |
//! | [`LockingStrategy::Spin`] | unowned key, busy-poll | spins forever, no fairness |
//! | [`LockingStrategy::Leased`] | owned lease, bounded wait | skips on wait timeout |
//!
//! Only the leased strategy can decline work: a wait timeout yields
//! [`DecrementOutcome::Skipped`] (with a warning log) rather than an error.
//! That is the one asymmetry among the four, preserved from the system this
//! models.
//!
//! ## Examples
//! ```rust
//! use invlock_facade::{DecrementOutcome, LockingStrategy, StockFacade};
//! use invlock_locks::InMemoryLockStore;
//! use invlock_stock::{InMemoryStockStore, StockStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryStockStore::new());
//! store.create("item-1", 10).await?;
//!
//! let facade = StockFacade::new(
//!     store,
//!     Arc::new(InMemoryLockStore::new()),
//!     LockingStrategy::Pessimistic,
//! );
//!
//! match facade.decrease("item-1", 3).await? {
//!     DecrementOutcome::Applied(stock) => assert_eq!(stock.quantity, 7),
//!     DecrementOutcome::Skipped => unreachable!("pessimistic never skips"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod facade;

pub use config::{strategy_from_env, LockingStrategy};
pub use facade::{DecrementOutcome, StockFacade};
