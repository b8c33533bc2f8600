// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Per-key lock table
//!
//! A keyed async mutex over `(FileId, Option<VariantId>)` (spec.md §4.3).
//! Each key gets its own `tokio::sync::Mutex`, looked up and lazily
//! inserted under a short-held `parking_lot::Mutex` over the map itself —
//! the map lock is never held across an `.await`, only the per-key lock is.
//!
//! Entries are never removed: the number of distinct keys a repository
//! ever touches is bounded by the number of files it has ever held, which
//! is the same order of magnitude as the repository's own directory count,
//! so leaking one small `Arc<Mutex<()>>` per key is an acceptable tradeoff
//! for never having to coordinate eviction with in-flight waiters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use file_repo_domain::{FileId, RepoError, VariantId};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub type LockKey = (FileId, Option<VariantId>);

#[derive(Default)]
pub struct LockTable {
    entries: SyncMutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: LockKey) -> Arc<AsyncMutex<()>> {
        let mut entries = self.entries.lock();
        entries.entry(key).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Waits for the lock on `key`, returning an RAII guard that releases it
    /// on drop.
    pub async fn lock(&self, key: LockKey) -> OwnedMutexGuard<()> {
        self.entry(key).lock_owned().await
    }

    /// Attempts to take the lock on `key` within `timeout`, surfacing
    /// contention as `RepoError::Timeout` (spec.md §4.3's `try_lock`).
    /// `timeout == Duration::ZERO` degenerates to a single non-blocking
    /// attempt.
    pub async fn try_lock(&self, key: LockKey, timeout: Duration) -> Result<OwnedMutexGuard<()>, RepoError> {
        let entry = self.entry(key);
        if timeout.is_zero() {
            return entry.try_lock_owned().map_err(|_| RepoError::Timeout("lock contended".into()));
        }
        tokio::time::timeout(timeout, entry.lock_owned())
            .await
            .map_err(|_| RepoError::Timeout("lock acquisition timed out".into()))
    }

    pub fn key_count(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> FileId {
        FileId::from_ulid(ulid::Ulid::new())
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let table = LockTable::new();
        let a = id();
        let b = id();
        let _g1 = table.lock((a, None)).await;
        let _g2 = table.try_lock((b, None), Duration::ZERO).await.unwrap();
    }

    #[tokio::test]
    async fn same_key_blocks_until_released() {
        let table = Arc::new(LockTable::new());
        let key = (id(), None);
        let guard = table.lock(key.clone()).await;

        let table2 = table.clone();
        let key2 = key.clone();
        let handle = tokio::spawn(async move { table2.lock(key2).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        drop(guard);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn try_lock_times_out_on_contention() {
        let table = LockTable::new();
        let key = (id(), None);
        let _guard = table.lock(key.clone()).await;
        let result = table.try_lock(key, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(RepoError::Timeout(_))));
    }

    #[tokio::test]
    async fn main_and_variant_keys_are_independent() {
        let table = LockTable::new();
        let file = id();
        let variant = VariantId::parse("thumb").unwrap();
        let _g1 = table.lock((file, None)).await;
        let _g2 = table.try_lock((file, Some(variant)), Duration::ZERO).await.unwrap();
    }
}
