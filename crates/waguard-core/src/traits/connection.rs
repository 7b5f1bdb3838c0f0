// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read side of the external connection store.
//!
//! Throttle writes are not here: they travel inside the governor's
//! [`Changeset`](crate::records::Changeset) so they commit atomically
//! with the ledger rows that explain them.

use async_trait::async_trait;

use crate::error::GovernorError;
use crate::records::Connection;
use crate::types::ConnectionId;

#[async_trait]
pub trait ConnectionStore: Send + Sync + 'static {
    /// Look up a connection. `Ok(None)` when the id is unknown.
    async fn get_connection(&self, id: ConnectionId) -> Result<Option<Connection>, GovernorError>;

    /// Ids of all active connections, ascending.
    async fn list_connection_ids(&self) -> Result<Vec<ConnectionId>, GovernorError>;
}
