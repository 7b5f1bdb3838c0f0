// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for scores, warmup state, and the append-only ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::GovernorError;
use crate::records::{
    Changeset, HealthHistoryPoint, HealthScore, Page, Paged, Snapshot, WarmupAutoBlock,
    WarmupLimitChange, WarmupStateEvent,
};
use crate::types::{BlockType, ConnectionId};

/// Store owning HealthScore, HealthScoreHistory, Warmup, and the ledger tables.
///
/// Implementations must apply [`GovernorStore::commit`] atomically: either
/// every row in the changeset is written (including the connection's
/// throttle fields) or none is.
#[async_trait]
pub trait GovernorStore: Send + Sync + 'static {
    /// Current score, warmup record, and open blocks for a connection.
    async fn load_snapshot(&self, connection_id: ConnectionId) -> Result<Snapshot, GovernorError>;

    /// Apply a changeset in a single transaction.
    async fn commit(&self, changeset: Changeset) -> Result<(), GovernorError>;

    /// Current score of every scored connection.
    async fn list_health_scores(&self) -> Result<Vec<HealthScore>, GovernorError>;

    /// History points recorded at or after `since`, oldest first.
    async fn health_history(
        &self,
        connection_id: ConnectionId,
        since: DateTime<Utc>,
    ) -> Result<Vec<HealthHistoryPoint>, GovernorError>;

    /// Automatic health-drop transitions into cooldown recorded at or after `since`.
    async fn count_health_drop_cooldowns_since(
        &self,
        connection_id: ConnectionId,
        since: DateTime<Utc>,
    ) -> Result<u32, GovernorError>;

    async fn state_events(
        &self,
        connection_id: ConnectionId,
        page: Page,
    ) -> Result<Paged<WarmupStateEvent>, GovernorError>;

    async fn limit_changes(
        &self,
        connection_id: ConnectionId,
        page: Page,
    ) -> Result<Paged<WarmupLimitChange>, GovernorError>;

    async fn auto_blocks(
        &self,
        connection_id: ConnectionId,
        page: Page,
    ) -> Result<Paged<WarmupAutoBlock>, GovernorError>;

    /// Add to the `messages_blocked` counter of the open block of `block_type`.
    ///
    /// Called by the send pipeline when it drops messages because of a block.
    /// Returns `false` when no such block is open.
    async fn record_blocked_messages(
        &self,
        connection_id: ConnectionId,
        block_type: BlockType,
        count: u64,
    ) -> Result<bool, GovernorError>;
}
