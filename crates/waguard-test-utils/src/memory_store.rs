// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory connection and governor store.
//!
//! Mirrors the SQLite adapter's semantics: commits are all-or-nothing,
//! ledger rows get sequential ids, and blocks can only be resolved once.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use waguard_core::{
    BlockChange, BlockType, Changeset, Connection, ConnectionId, ConnectionStore, GovernorError,
    GovernorStore, HealthHistoryPoint, HealthScore, Page, Paged, Snapshot, TriggerType, Warmup,
    WarmupAutoBlock, WarmupLimitChange, WarmupState, WarmupStateEvent,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    connections: BTreeMap<ConnectionId, Connection>,
    scores: HashMap<ConnectionId, HealthScore>,
    history: Vec<HealthHistoryPoint>,
    warmups: HashMap<ConnectionId, Warmup>,
    events: Vec<WarmupStateEvent>,
    limit_changes: Vec<WarmupLimitChange>,
    blocks: Vec<WarmupAutoBlock>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn apply(&mut self, cs: Changeset) -> Result<(), String> {
        let id = cs.connection_id;
        if !self.connections.contains_key(&id) {
            return Err(format!("connection {id} does not exist"));
        }
        if let Some(health) = cs.health {
            self.scores.insert(id, health);
        }
        if let Some(point) = cs.history {
            self.history.push(point);
        }
        if let Some(warmup) = cs.warmup {
            self.warmups.insert(id, warmup);
        }
        if let Some(throttle) = cs.throttle {
            if let Some(conn) = self.connections.get_mut(&id) {
                conn.throttle = throttle;
            }
        }
        for mut event in cs.state_events {
            event.id = Some(self.next_id());
            self.events.push(event);
        }
        for mut change in cs.limit_changes {
            change.id = Some(self.next_id());
            self.limit_changes.push(change);
        }
        for block in cs.blocks {
            match block {
                BlockChange::Open(mut b) => {
                    b.id = Some(self.next_id());
                    self.blocks.push(b);
                }
                BlockChange::Resolve(r) => {
                    for b in self.blocks.iter_mut().filter(|b| {
                        b.connection_id == id && b.block_type == r.block_type && !b.is_resolved
                    }) {
                        b.is_resolved = true;
                        b.resolved_at = Some(r.resolved_at);
                        b.resolved_by_type = Some(r.resolved_by);
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct InjectedFailure(String);

impl std::fmt::Display for InjectedFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InjectedFailure {}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_next_commit: AtomicBool,
    commits: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_connection(&self, connection: Connection) {
        self.tables
            .lock()
            .await
            .connections
            .insert(connection.id, connection);
    }

    /// Seed a warmup record directly, bypassing the ledger.
    pub async fn put_warmup(&self, warmup: Warmup) {
        self.tables
            .lock()
            .await
            .warmups
            .insert(warmup.connection_id, warmup);
    }

    /// Seed a current score directly, bypassing the ledger.
    pub async fn put_score(&self, score: HealthScore) {
        self.tables
            .lock()
            .await
            .scores
            .insert(score.connection_id, score);
    }

    /// Make the next `commit` fail with `LedgerWriteFailed` and apply nothing.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Successful commits so far.
    pub fn commits(&self) -> u32 {
        self.commits.load(Ordering::SeqCst)
    }

    pub async fn connection(&self, id: ConnectionId) -> Option<Connection> {
        self.tables.lock().await.connections.get(&id).cloned()
    }

    /// Every state event for a connection, oldest first.
    pub async fn all_events(&self, id: ConnectionId) -> Vec<WarmupStateEvent> {
        self.tables
            .lock()
            .await
            .events
            .iter()
            .filter(|e| e.connection_id == id)
            .cloned()
            .collect()
    }

    pub async fn all_limit_changes(&self, id: ConnectionId) -> Vec<WarmupLimitChange> {
        self.tables
            .lock()
            .await
            .limit_changes
            .iter()
            .filter(|c| c.connection_id == id)
            .cloned()
            .collect()
    }

    pub async fn all_blocks(&self, id: ConnectionId) -> Vec<WarmupAutoBlock> {
        self.tables
            .lock()
            .await
            .blocks
            .iter()
            .filter(|b| b.connection_id == id)
            .cloned()
            .collect()
    }
}

/// Newest first, paged.
fn page_of<T: Clone>(mut rows: Vec<T>, page: Page) -> Paged<T> {
    rows.reverse();
    let total = rows.len() as u64;
    let items = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.per_page as usize)
        .collect();
    Paged {
        items,
        page: page.page,
        per_page: page.per_page,
        total,
    }
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn get_connection(&self, id: ConnectionId) -> Result<Option<Connection>, GovernorError> {
        Ok(self.tables.lock().await.connections.get(&id).cloned())
    }

    async fn list_connection_ids(&self) -> Result<Vec<ConnectionId>, GovernorError> {
        Ok(self
            .tables
            .lock()
            .await
            .connections
            .values()
            .filter(|c| c.is_active)
            .map(|c| c.id)
            .collect())
    }
}

#[async_trait]
impl GovernorStore for MemoryStore {
    async fn load_snapshot(&self, connection_id: ConnectionId) -> Result<Snapshot, GovernorError> {
        let tables = self.tables.lock().await;
        Ok(Snapshot {
            health: tables.scores.get(&connection_id).cloned(),
            warmup: tables.warmups.get(&connection_id).cloned(),
            open_blocks: tables
                .blocks
                .iter()
                .filter(|b| b.connection_id == connection_id && !b.is_resolved)
                .cloned()
                .collect(),
        })
    }

    async fn commit(&self, changeset: Changeset) -> Result<(), GovernorError> {
        let connection_id = changeset.connection_id;
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(GovernorError::LedgerWriteFailed {
                connection_id,
                source: Box::new(InjectedFailure("injected commit failure".into())),
            });
        }
        let mut tables = self.tables.lock().await;
        let mut staged = tables.clone();
        staged
            .apply(changeset)
            .map_err(|message| GovernorError::LedgerWriteFailed {
                connection_id,
                source: Box::new(InjectedFailure(message)),
            })?;
        *tables = staged;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_health_scores(&self) -> Result<Vec<HealthScore>, GovernorError> {
        let tables = self.tables.lock().await;
        let mut scores: Vec<HealthScore> = tables.scores.values().cloned().collect();
        scores.sort_by_key(|s| s.connection_id);
        Ok(scores)
    }

    async fn health_history(
        &self,
        connection_id: ConnectionId,
        since: DateTime<Utc>,
    ) -> Result<Vec<HealthHistoryPoint>, GovernorError> {
        let tables = self.tables.lock().await;
        let mut points: Vec<HealthHistoryPoint> = tables
            .history
            .iter()
            .filter(|p| p.connection_id == connection_id && p.recorded_at >= since)
            .cloned()
            .collect();
        points.sort_by_key(|p| p.recorded_at);
        Ok(points)
    }

    async fn count_health_drop_cooldowns_since(
        &self,
        connection_id: ConnectionId,
        since: DateTime<Utc>,
    ) -> Result<u32, GovernorError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .events
            .iter()
            .filter(|e| {
                e.connection_id == connection_id
                    && e.trigger_type == TriggerType::HealthDrop
                    && e.to_state == WarmupState::Cooldown
                    && e.created_at >= since
            })
            .count() as u32)
    }

    async fn state_events(
        &self,
        connection_id: ConnectionId,
        page: Page,
    ) -> Result<Paged<WarmupStateEvent>, GovernorError> {
        Ok(page_of(self.all_events(connection_id).await, page))
    }

    async fn limit_changes(
        &self,
        connection_id: ConnectionId,
        page: Page,
    ) -> Result<Paged<WarmupLimitChange>, GovernorError> {
        Ok(page_of(self.all_limit_changes(connection_id).await, page))
    }

    async fn auto_blocks(
        &self,
        connection_id: ConnectionId,
        page: Page,
    ) -> Result<Paged<WarmupAutoBlock>, GovernorError> {
        Ok(page_of(self.all_blocks(connection_id).await, page))
    }

    async fn record_blocked_messages(
        &self,
        connection_id: ConnectionId,
        block_type: BlockType,
        count: u64,
    ) -> Result<bool, GovernorError> {
        let mut tables = self.tables.lock().await;
        let mut found = false;
        for b in tables.blocks.iter_mut().filter(|b| {
            b.connection_id == connection_id && b.block_type == block_type && !b.is_resolved
        }) {
            b.messages_blocked += count;
            found = true;
        }
        Ok(found)
    }
}
