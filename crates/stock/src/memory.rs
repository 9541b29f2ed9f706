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

//! In-memory stock store implementation.
//!
//! ## Purpose
//! HashMap-based [`StockStore`] backend for testing and single-process
//! scenarios.
//!
//! ## Row-lock model
//! Each row pairs the committed value with a per-row async mutex (the
//! "latch"). [`StockStore::lock_exclusive`] holds the latch for the guard's
//! lifetime; plain reads go through the committed value only and are never
//! blocked by a latch holder, matching snapshot-read semantics of a row
//! store.
//!
//! ## Limitations
//! - Not persistent (rows lost on restart)
//! - Not distributed (single process only)

use crate::{ExclusiveStock, Stock, StockError, StockResult, StockStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

struct Row {
    committed: RwLock<Stock>,
    latch: Arc<Mutex<()>>,
}

impl Row {
    fn new(stock: Stock) -> Self {
        Self {
            committed: RwLock::new(stock),
            latch: Arc::new(Mutex::new(())),
        }
    }
}

/// In-memory stock store.
///
/// ## Example
/// ```rust
/// use invlock_stock::{InMemoryStockStore, StockStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryStockStore::new();
/// store.create("item-1", 100).await?;
/// assert_eq!(store.get("item-1").await?.quantity, 100);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStockStore {
    rows: Arc<RwLock<HashMap<String, Arc<Row>>>>,
}

impl InMemoryStockStore {
    /// Create a new in-memory stock store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn row(&self, id: &str) -> StockResult<Arc<Row>> {
        let rows = self.rows.read().await;
        rows.get(id)
            .cloned()
            .ok_or_else(|| StockError::NotFound(id.to_string()))
    }
}

/// Exclusive hold on one in-memory row.
///
/// Holds the row latch until committed or dropped. Drop without commit is
/// rollback: the committed value is untouched and the latch is released.
struct ExclusiveRow {
    row: Arc<Row>,
    snapshot: Stock,
    _latch: OwnedMutexGuard<()>,
}

#[async_trait]
impl ExclusiveStock for ExclusiveRow {
    fn stock(&self) -> &Stock {
        &self.snapshot
    }

    async fn commit(self: Box<Self>, new_quantity: u64) -> StockResult<Stock> {
        let mut committed = self.row.committed.write().await;
        committed.quantity = new_quantity;
        committed.version += 1;
        debug!(
            id = %committed.id,
            quantity = committed.quantity,
            version = committed.version,
            "committed exclusive write"
        );
        Ok(committed.clone())
        // latch guard drops here, releasing the row lock
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn create(&self, id: &str, quantity: u64) -> StockResult<Stock> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(id) {
            return Err(StockError::AlreadyExists(id.to_string()));
        }
        let stock = Stock {
            id: id.to_string(),
            quantity,
            version: 0,
        };
        rows.insert(id.to_string(), Arc::new(Row::new(stock.clone())));
        Ok(stock)
    }

    async fn get(&self, id: &str) -> StockResult<Stock> {
        let row = self.row(id).await?;
        let committed = row.committed.read().await;
        Ok(committed.clone())
    }

    async fn lock_exclusive(&self, id: &str) -> StockResult<Box<dyn ExclusiveStock>> {
        let row = self.row(id).await?;
        // Blocks until any other exclusive holder of this row releases.
        let latch = row.latch.clone().lock_owned().await;
        let snapshot = row.committed.read().await.clone();
        Ok(Box::new(ExclusiveRow {
            row,
            snapshot,
            _latch: latch,
        }))
    }

    async fn write_conditional(
        &self,
        id: &str,
        new_quantity: u64,
        expected_version: u64,
    ) -> StockResult<Stock> {
        let row = self.row(id).await?;
        let mut committed = row.committed.write().await;
        if committed.version != expected_version {
            debug!(
                id = %committed.id,
                expected = expected_version,
                actual = committed.version,
                "conditional write lost version race"
            );
            return Err(StockError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual: committed.version,
            });
        }
        committed.quantity = new_quantity;
        committed.version += 1;
        Ok(committed.clone())
    }

    async fn write_direct(&self, id: &str, new_quantity: u64) -> StockResult<Stock> {
        let row = self.row(id).await?;
        let mut committed = row.committed.write().await;
        committed.quantity = new_quantity;
        committed.version += 1;
        Ok(committed.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout, Duration};

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryStockStore::new();
        let stock = store.create("item-1", 10).await.unwrap();
        assert_eq!(stock.quantity, 10);
        assert_eq!(stock.version, 0);

        let read = store.get("item-1").await.unwrap();
        assert_eq!(read, stock);
    }

    #[tokio::test]
    async fn test_create_already_exists() {
        let store = InMemoryStockStore::new();
        store.create("item-1", 10).await.unwrap();
        let result = store.create("item-1", 20).await;
        assert!(matches!(result, Err(StockError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let store = InMemoryStockStore::new();
        let result = store.get("missing").await;
        assert!(matches!(result, Err(StockError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_exclusive_commit_bumps_version() {
        let store = InMemoryStockStore::new();
        store.create("item-1", 10).await.unwrap();

        let row = store.lock_exclusive("item-1").await.unwrap();
        assert_eq!(row.stock().quantity, 10);
        let stock = row.commit(7).await.unwrap();
        assert_eq!(stock.quantity, 7);
        assert_eq!(stock.version, 1);

        assert_eq!(store.get("item-1").await.unwrap().quantity, 7);
    }

    #[tokio::test]
    async fn test_exclusive_drop_is_rollback() {
        let store = InMemoryStockStore::new();
        store.create("item-1", 10).await.unwrap();

        {
            let row = store.lock_exclusive("item-1").await.unwrap();
            assert_eq!(row.stock().quantity, 10);
            // dropped without commit
        }

        let stock = store.get("item-1").await.unwrap();
        assert_eq!(stock.quantity, 10);
        assert_eq!(stock.version, 0);

        // Row lock was released by the drop; a second exclusive succeeds.
        let row = store.lock_exclusive("item-1").await.unwrap();
        row.commit(9).await.unwrap();
    }

    #[tokio::test]
    async fn test_exclusive_blocks_second_holder() {
        let store = InMemoryStockStore::new();
        store.create("item-1", 10).await.unwrap();

        let held = store.lock_exclusive("item-1").await.unwrap();

        // Second exclusive must block while the first guard lives.
        let blocked = timeout(Duration::from_millis(50), store.lock_exclusive("item-1")).await;
        assert!(blocked.is_err(), "second exclusive should block");

        held.commit(9).await.unwrap();

        // After commit the lock is free again.
        let row = timeout(Duration::from_millis(50), store.lock_exclusive("item-1"))
            .await
            .expect("lock should be free after commit")
            .unwrap();
        assert_eq!(row.stock().quantity, 9);
    }

    #[tokio::test]
    async fn test_snapshot_read_not_blocked_by_exclusive_holder() {
        let store = InMemoryStockStore::new();
        store.create("item-1", 10).await.unwrap();

        let _held = store.lock_exclusive("item-1").await.unwrap();
        let read = timeout(Duration::from_millis(50), store.get("item-1")).await;
        assert_eq!(read.expect("plain read must not block").unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_write_conditional() {
        let store = InMemoryStockStore::new();
        store.create("item-1", 10).await.unwrap();

        let stock = store.write_conditional("item-1", 9, 0).await.unwrap();
        assert_eq!(stock.quantity, 9);
        assert_eq!(stock.version, 1);
    }

    #[tokio::test]
    async fn test_write_conditional_version_conflict() {
        let store = InMemoryStockStore::new();
        store.create("item-1", 10).await.unwrap();
        store.write_conditional("item-1", 9, 0).await.unwrap();

        // Stale version loses; no change is made.
        let result = store.write_conditional("item-1", 8, 0).await;
        match result {
            Err(StockError::VersionConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("expected VersionConflict, got {:?}", other),
        }
        assert_eq!(store.get("item-1").await.unwrap().quantity, 9);
    }

    #[tokio::test]
    async fn test_write_direct() {
        let store = InMemoryStockStore::new();
        store.create("item-1", 10).await.unwrap();

        let stock = store.write_direct("item-1", 3).await.unwrap();
        assert_eq!(stock.quantity, 3);
        assert_eq!(stock.version, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exclusive_serializes_writers() {
        let store = Arc::new(InMemoryStockStore::new());
        store.create("item-1", 100).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let row = store.lock_exclusive("item-1").await.unwrap();
                let quantity = row.stock().quantity;
                // Hold the lock across an await point to widen any race.
                sleep(Duration::from_millis(1)).await;
                row.commit(quantity - 1).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stock = store.get("item-1").await.unwrap();
        assert_eq!(stock.quantity, 90);
        assert_eq!(stock.version, 10);
    }
}
