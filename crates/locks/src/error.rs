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

//! Error types for lock operations.

use thiserror::Error;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors that can occur during lock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// Invalid lock key (empty)
    #[error("Invalid lock key: {0:?}")]
    InvalidKey(String),

    /// Lease no longer owned at release time (expired or reclaimed)
    #[error("Lease expired or reclaimed: {0}")]
    LeaseExpired(String),

    /// Backend error (key store, network, etc.)
    #[error("Backend error: {0}")]
    BackendError(String),
}
