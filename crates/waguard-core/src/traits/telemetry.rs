// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telemetry source trait over the message-log store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::GovernorError;
use crate::records::MessageStats;
use crate::types::ConnectionId;

/// Reads aggregated send/delivery/failure counts for a connection.
#[async_trait]
pub trait TelemetrySource: Send + Sync + 'static {
    /// Aggregate counts for messages sent in `[window_start, window_end)`.
    ///
    /// `hourly_sends` must contain one bucket per hour of the window, oldest first.
    async fn message_stats(
        &self,
        connection_id: ConnectionId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<MessageStats, GovernorError>;
}
