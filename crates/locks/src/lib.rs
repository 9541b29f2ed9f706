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

//! # InvLock Distributed Locks
//!
//! ## Purpose
//! Provides the mutual-exclusion primitives used by the distributed
//! decrement strategies: a shared key store seam ([`LockStore`]) and two
//! lock disciplines built on it.
//!
//! ## The two primitives are intentionally distinct types
//!
//! - [`SpinLock`]: busy-poll acquisition with no timeout, no ownership token
//!   and no fairness. Any caller can release any holder's lock, and a TTL
//!   shorter than the critical section admits a second concurrent holder.
//!   These weaknesses are part of its contract, kept visible rather than
//!   hidden behind the stronger interface.
//! - [`LeasedLock`]: bounded-wait acquisition of an owned lease. The
//!   returned [`Lease`] auto-renews its TTL in a background watchdog, so it
//!   does not expire mid-use unless the holder process dies, and release is
//!   token-checked.
//!
//! ## Backend Support
//! - [`InMemoryLockStore`]: HashMap-based (always available, for testing).
//!   A Redis-style backend would implement [`LockStore`] with `SET NX PX` /
//!   `DEL` / Lua compare-and-delete; the backend's own replication is out of
//!   scope here.
//!
//! ## Examples
//! ```rust
//! use invlock_locks::{InMemoryLockStore, LeasedLock, SpinLock};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryLockStore::new());
//!
//! // Spin: loops until the key is free, released by bare delete.
//! let spin = SpinLock::new(store.clone());
//! spin.acquire("item-1").await?;
//! spin.release("item-1").await?;
//!
//! // Leased: bounded wait, owned token, watchdog renewal.
//! let leased = LeasedLock::new(store);
//! if let Some(lease) = leased
//!     .acquire("item-1", Duration::from_secs(10), Duration::from_secs(1))
//!     .await?
//! {
//!     // ... critical section ...
//!     lease.release().await?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod lease;
pub mod spin;
pub mod store;

pub use error::{LockError, LockResult};
pub use lease::{Lease, LeasedLock};
pub use spin::SpinLock;
pub use store::{InMemoryLockStore, LockStore};
