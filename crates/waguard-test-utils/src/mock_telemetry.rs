// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted telemetry source.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use waguard_core::{ConnectionId, GovernorError, MessageStats, TelemetrySource};

/// Returns whatever stats were set for a connection.
///
/// Connections with nothing set report zero sends. A configured delay is
/// slept before every read, and failing connections return
/// `TelemetryUnavailable`.
#[derive(Default)]
pub struct MockTelemetry {
    stats: Mutex<HashMap<ConnectionId, MessageStats>>,
    failing: Mutex<HashSet<ConnectionId>>,
    delay: Mutex<Option<Duration>>,
    reads: Mutex<u32>,
}

impl MockTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_stats(&self, id: ConnectionId, stats: MessageStats) {
        self.stats.lock().await.insert(id, stats);
    }

    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().await = delay;
    }

    pub async fn fail(&self, id: ConnectionId, failing: bool) {
        let mut set = self.failing.lock().await;
        if failing {
            set.insert(id);
        } else {
            set.remove(&id);
        }
    }

    /// Number of `message_stats` calls served so far.
    pub async fn reads(&self) -> u32 {
        *self.reads.lock().await
    }
}

#[async_trait]
impl TelemetrySource for MockTelemetry {
    async fn message_stats(
        &self,
        connection_id: ConnectionId,
        _window_start: DateTime<Utc>,
        _window_end: DateTime<Utc>,
    ) -> Result<MessageStats, GovernorError> {
        *self.reads.lock().await += 1;
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().await.contains(&connection_id) {
            return Err(GovernorError::TelemetryUnavailable {
                connection_id,
                message: "mock telemetry failure".to_string(),
            });
        }
        Ok(self
            .stats
            .lock()
            .await
            .get(&connection_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_scripted_stats() {
        let telemetry = MockTelemetry::new();
        let id = ConnectionId(1);
        let now = Utc::now();
        telemetry
            .set_stats(
                id,
                MessageStats {
                    sent: 10,
                    delivered: 9,
                    ..MessageStats::default()
                },
            )
            .await;
        assert_eq!(telemetry.message_stats(id, now, now).await.unwrap().sent, 10);
        assert_eq!(
            telemetry.message_stats(ConnectionId(2), now, now).await.unwrap().sent,
            0
        );

        telemetry.fail(id, true).await;
        assert!(telemetry.message_stats(id, now, now).await.is_err());
        assert_eq!(telemetry.reads().await, 3);
    }
}
