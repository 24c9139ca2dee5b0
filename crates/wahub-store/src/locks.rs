// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named mutexes serializing store projections.
//!
//! Every projection handler takes the lock for its entity kind
//! (`messages`, `chats`, `contacts`, `groups`) or a per-group lock
//! (`group-{id}`), so handlers for the same data never interleave while
//! different kinds proceed in parallel. Waiters are unbounded; fairness is
//! whatever the underlying mutex provides.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// A lazily-growing arena of named locks.
#[derive(Default)]
pub struct LockArena {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock with the given name, creating it on first use.
    pub async fn acquire(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn same_name_serializes_critical_sections() {
        let arena = Arc::new(LockArena::new());
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let arena = arena.clone();
            let running = running.clone();
            let max_seen = max_seen.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = arena.acquire("messages").await;
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_names_do_not_block_each_other() {
        let arena = LockArena::new();
        let _messages = arena.acquire("messages").await;
        // Must not deadlock.
        let _chats = arena.acquire("chats").await;
    }
}
