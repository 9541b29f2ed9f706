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

//! Error types for stock store operations.

use thiserror::Error;

/// Result type for stock store operations.
pub type StockResult<T> = Result<T, StockError>;

/// Errors that can occur during stock operations.
///
/// Propagation policy: `NotFound`, `AlreadyExists`, `InsufficientStock`, and
/// `BackendError` reach callers unchanged. `VersionConflict` is internal to
/// the optimistic retry loop and never escapes the facade.
#[derive(Error, Debug)]
pub enum StockError {
    /// Stock id unknown; fatal, surfaced immediately, never retried
    #[error("Stock not found: {0}")]
    NotFound(String),

    /// Seed attempted for an id that already exists
    #[error("Stock already exists: {0}")]
    AlreadyExists(String),

    /// Requested amount exceeds current quantity; permanent, never retried
    #[error("Insufficient stock for {id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Stock identifier
        id: String,
        /// Units requested
        requested: u64,
        /// Units on hand at read time
        available: u64,
    },

    /// Version-conditioned write lost a race (optimistic locking failure)
    #[error("Version conflict for {id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Stock identifier
        id: String,
        /// Version the writer read
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// Backend error (database, network, etc.), propagated unchanged
    #[error("Backend error: {0}")]
    BackendError(String),
}
