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

//! Locking strategy configuration.
//!
//! ## Purpose
//! Selects and tunes a decrement strategy, either programmatically, from
//! serialized config, or from the environment.
//!
//! ## Environment Variables
//! - `INVLOCK_STRATEGY`: strategy name (default: "pessimistic")
//!   - "pessimistic" → store row lock
//!   - "optimistic" → version CAS with retry
//!   - "spin" → busy-poll lock
//!   - "leased" → owned lease with bounded wait
//! - `INVLOCK_BACKOFF_MS`: optimistic retry backoff (default: 50)
//! - `INVLOCK_POLL_INTERVAL_MS`: spin poll interval (default: 100)
//! - `INVLOCK_LOCK_TTL_MS`: spin lock key TTL (default: none)
//! - `INVLOCK_WAIT_TIMEOUT_MS`: leased acquisition wait (default: 10000)
//! - `INVLOCK_LEASE_TIME_MS`: lease duration (default: 1000)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default backoff between optimistic retries.
pub const DEFAULT_BACKOFF_MS: u64 = 50;
/// Default sleep between spin-lock acquisition attempts.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
/// Default bounded wait for lease acquisition.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;
/// Default lease duration.
pub const DEFAULT_LEASE_TIME_MS: u64 = 1_000;

/// Configuration error when parsing a strategy from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Unrecognized strategy name
    #[error("Unknown strategy: {0:?} (expected pessimistic|optimistic|spin|leased)")]
    UnknownStrategy(String),

    /// A tuning variable did not parse as an integer
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue {
        /// Environment variable name
        var: &'static str,
        /// The offending value
        value: String,
    },
}

/// Concurrency-control strategy for the decrement operation.
///
/// One tagged variant per strategy, carrying the strategy-specific tuning.
/// All intervals are milliseconds in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LockingStrategy {
    /// Exclusive row lock in the stock store; no distributed lock involved.
    Pessimistic,

    /// Version-conditioned writes with an unbounded retry loop.
    OptimisticRetry {
        /// Sleep between retries after a version conflict.
        #[serde(default = "default_backoff_ms")]
        backoff_ms: u64,
    },

    /// Unowned busy-poll lock over the shared key store.
    Spin {
        /// Sleep between acquisition attempts.
        #[serde(default = "default_poll_interval_ms")]
        poll_interval_ms: u64,
        /// Optional TTL on the lock key (crash recovery; see the spin lock
        /// docs for the hazard when shorter than the critical section).
        #[serde(default)]
        ttl_ms: Option<u64>,
    },

    /// Owned lease with bounded wait and watchdog renewal.
    Leased {
        /// How long acquisition may wait before the operation is skipped.
        #[serde(default = "default_wait_timeout_ms")]
        wait_timeout_ms: u64,
        /// Lease duration; renewed while held, expiry bound if the holder dies.
        #[serde(default = "default_lease_time_ms")]
        lease_time_ms: u64,
    },
}

fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_wait_timeout_ms() -> u64 {
    DEFAULT_WAIT_TIMEOUT_MS
}

fn default_lease_time_ms() -> u64 {
    DEFAULT_LEASE_TIME_MS
}

impl Default for LockingStrategy {
    fn default() -> Self {
        Self::Pessimistic
    }
}

impl LockingStrategy {
    /// Optimistic strategy with the default backoff.
    pub fn optimistic() -> Self {
        Self::OptimisticRetry {
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }

    /// Spin strategy with the default poll interval and no TTL.
    pub fn spin() -> Self {
        Self::Spin {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            ttl_ms: None,
        }
    }

    /// Leased strategy with the default wait timeout and lease time.
    pub fn leased() -> Self {
        Self::Leased {
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            lease_time_ms: DEFAULT_LEASE_TIME_MS,
        }
    }
}

fn env_ms(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(default),
    }
}

fn env_ms_opt(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(None),
    }
}

/// Build a [`LockingStrategy`] from `INVLOCK_*` environment variables.
pub fn strategy_from_env() -> Result<LockingStrategy, ConfigError> {
    let name = std::env::var("INVLOCK_STRATEGY").unwrap_or_else(|_| "pessimistic".to_string());
    match name.to_lowercase().as_str() {
        "pessimistic" => Ok(LockingStrategy::Pessimistic),
        "optimistic" => Ok(LockingStrategy::OptimisticRetry {
            backoff_ms: env_ms("INVLOCK_BACKOFF_MS", DEFAULT_BACKOFF_MS)?,
        }),
        "spin" => Ok(LockingStrategy::Spin {
            poll_interval_ms: env_ms("INVLOCK_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?,
            ttl_ms: env_ms_opt("INVLOCK_LOCK_TTL_MS")?,
        }),
        "leased" => Ok(LockingStrategy::Leased {
            wait_timeout_ms: env_ms("INVLOCK_WAIT_TIMEOUT_MS", DEFAULT_WAIT_TIMEOUT_MS)?,
            lease_time_ms: env_ms("INVLOCK_LEASE_TIME_MS", DEFAULT_LEASE_TIME_MS)?,
        }),
        _ => Err(ConfigError::UnknownStrategy(name)),
    }
}

pub(crate) fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}
