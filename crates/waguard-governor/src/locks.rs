// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection mutual exclusion.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use waguard_core::{ConnectionId, GovernorError};

/// One async mutex per connection, created on first use.
///
/// Holding the guard for a whole read-compute-commit cycle is what keeps
/// two operations on the same number from interleaving. An entry lives only
/// while someone holds or waits on it.
#[derive(Debug)]
pub struct ConnectionLocks {
    locks: DashMap<ConnectionId, Arc<Mutex<()>>>,
    wait: Duration,
}

/// Exclusive access to one connection; releases and prunes on drop.
#[derive(Debug)]
pub struct ConnectionGuard<'a> {
    owner: &'a ConnectionLocks,
    id: ConnectionId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.owner.prune(self.id);
    }
}

impl ConnectionLocks {
    pub fn new(wait: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            wait,
        }
    }

    pub fn set_wait(&mut self, wait: Duration) {
        self.wait = wait;
    }

    /// Wait up to the configured budget for the connection's lock.
    pub async fn acquire(&self, id: ConnectionId) -> Result<ConnectionGuard<'_>, GovernorError> {
        let lock = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let acquired = tokio::time::timeout(self.wait, lock.lock_owned()).await;
        match acquired {
            Ok(guard) => Ok(ConnectionGuard {
                owner: self,
                id,
                guard: Some(guard),
            }),
            Err(_) => {
                self.prune(id);
                Err(GovernorError::RecomputeInProgress { connection_id: id })
            }
        }
    }

    /// Drop the entry once the map holds the only reference.
    fn prune(&self, id: ConnectionId) {
        self.locks.remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Connections with an operation holding or waiting on their lock.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
