// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the governor's collaborator traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use waguard_config::model::StorageConfig;
use waguard_core::{
    BlockType, Changeset, Connection, ConnectionId, ConnectionStore, GovernorError,
    GovernorStore, HealthHistoryPoint, HealthScore, MessageStats, Page, Paged, Snapshot,
    TelemetrySource, WarmupAutoBlock, WarmupLimitChange, WarmupStateEvent,
};

use crate::database::Database;
use crate::models::MessageEvent;
use crate::{ledger, queries};

/// SQLite-backed store for connections, telemetry, scores, warmups, and the ledger.
///
/// One store serves all three traits so that throttle writes and ledger rows
/// share a transaction. The database is opened by [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store; nothing is opened until [`initialize`](Self::initialize).
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations. Calling twice is a no-op.
    pub async fn initialize(&self) -> Result<(), GovernorError> {
        self.db
            .get_or_try_init(|| {
                Database::open_with(&self.config.database_path, self.config.wal_mode)
            })
            .await?;
        Ok(())
    }

    fn db(&self) -> Result<&Database, GovernorError> {
        self.db.get().ok_or_else(|| GovernorError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Cheap liveness check used by the gateway's `/healthz`.
    pub async fn health_check(&self) -> Result<(), GovernorError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)
    }

    /// Register a connection.
    pub async fn insert_connection(&self, connection: &Connection) -> Result<(), GovernorError> {
        queries::connections::insert_connection(self.db()?, connection).await
    }

    /// Append a message outcome to the telemetry log.
    pub async fn record_message_event(&self, event: &MessageEvent) -> Result<(), GovernorError> {
        queries::telemetry::record_message_event(self.db()?, event).await
    }

    /// Checkpoint and close. The store cannot be used afterwards.
    pub async fn close(self) -> Result<(), GovernorError> {
        if let Some(db) = self.db.into_inner() {
            db.close().await?;
        }
        debug!("sqlite store closed");
        Ok(())
    }
}

#[async_trait]
impl ConnectionStore for SqliteStore {
    async fn get_connection(&self, id: ConnectionId) -> Result<Option<Connection>, GovernorError> {
        queries::connections::get_connection(self.db()?, id).await
    }

    async fn list_connection_ids(&self) -> Result<Vec<ConnectionId>, GovernorError> {
        queries::connections::list_active_ids(self.db()?).await
    }
}

#[async_trait]
impl TelemetrySource for SqliteStore {
    async fn message_stats(
        &self,
        connection_id: ConnectionId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<MessageStats, GovernorError> {
        queries::telemetry::message_stats(self.db()?, connection_id, window_start, window_end)
            .await
            .map_err(|e| GovernorError::TelemetryUnavailable {
                connection_id,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl GovernorStore for SqliteStore {
    async fn load_snapshot(&self, connection_id: ConnectionId) -> Result<Snapshot, GovernorError> {
        ledger::load_snapshot(self.db()?, connection_id).await
    }

    async fn commit(&self, changeset: Changeset) -> Result<(), GovernorError> {
        ledger::commit(self.db()?, changeset).await
    }

    async fn list_health_scores(&self) -> Result<Vec<HealthScore>, GovernorError> {
        queries::scores::list_scores(self.db()?).await
    }

    async fn health_history(
        &self,
        connection_id: ConnectionId,
        since: DateTime<Utc>,
    ) -> Result<Vec<HealthHistoryPoint>, GovernorError> {
        queries::scores::history_since(self.db()?, connection_id, since).await
    }

    async fn count_health_drop_cooldowns_since(
        &self,
        connection_id: ConnectionId,
        since: DateTime<Utc>,
    ) -> Result<u32, GovernorError> {
        ledger::count_health_drop_cooldowns_since(self.db()?, connection_id, since).await
    }

    async fn state_events(
        &self,
        connection_id: ConnectionId,
        page: Page,
    ) -> Result<Paged<WarmupStateEvent>, GovernorError> {
        ledger::state_events(self.db()?, connection_id, page).await
    }

    async fn limit_changes(
        &self,
        connection_id: ConnectionId,
        page: Page,
    ) -> Result<Paged<WarmupLimitChange>, GovernorError> {
        ledger::limit_changes(self.db()?, connection_id, page).await
    }

    async fn auto_blocks(
        &self,
        connection_id: ConnectionId,
        page: Page,
    ) -> Result<Paged<WarmupAutoBlock>, GovernorError> {
        ledger::auto_blocks(self.db()?, connection_id, page).await
    }

    async fn record_blocked_messages(
        &self,
        connection_id: ConnectionId,
        block_type: BlockType,
        count: u64,
    ) -> Result<bool, GovernorError> {
        ledger::record_blocked_messages(self.db()?, connection_id, block_type, count).await
    }
}
