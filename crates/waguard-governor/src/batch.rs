// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recompute every active connection with bounded concurrency.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};
use waguard_core::{ConnectionId, ErrorKind, GovernorError, HealthGrade, ScoreWindow};

use crate::metrics;
use crate::service::Governor;

/// Result of one connection in a batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionOutcome {
    pub connection_id: ConnectionId,
    #[serde(flatten)]
    pub result: OutcomeResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OutcomeResult {
    Scored { score: f64, status: HealthGrade },
    Failed { kind: ErrorKind, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub window: ScoreWindow,
    pub started_at: DateTime<Utc>,
    /// Ordered by connection id.
    pub outcomes: Vec<ConnectionOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn outcome(&self, id: ConnectionId) -> Option<&OutcomeResult> {
        self.outcomes
            .iter()
            .find(|o| o.connection_id == id)
            .map(|o| &o.result)
    }
}

impl Governor {
    /// Recompute all active connections.
    ///
    /// A failure on one connection is reported in its outcome and never
    /// stops the others. Only listing the connections can fail the batch.
    pub async fn recalculate_all(&self, window: ScoreWindow) -> Result<BatchReport, GovernorError> {
        let started_at = self.clock.now();
        let ids = self.connections.list_connection_ids().await?;
        info!(connections = ids.len(), %window, "batch recompute started");

        let mut outcomes: Vec<ConnectionOutcome> = stream::iter(ids)
            .map(|id| async move {
                let result = match self.recalculate(id, window).await {
                    Ok(score) => OutcomeResult::Scored {
                        score: score.score,
                        status: score.status,
                    },
                    Err(e) => {
                        if !matches!(e, GovernorError::InsufficientData { .. }) {
                            warn!(connection_id = %id, error = %e, "recompute failed");
                        }
                        OutcomeResult::Failed {
                            kind: e.kind(),
                            message: e.to_string(),
                        }
                    }
                };
                ConnectionOutcome {
                    connection_id: id,
                    result,
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|o| o.connection_id);

        let succeeded = outcomes
            .iter()
            .filter(|o| matches!(o.result, OutcomeResult::Scored { .. }))
            .count();
        let failed = outcomes.len() - succeeded;

        self.refresh_status_gauges().await;
        info!(succeeded, failed, %window, "batch recompute finished");

        Ok(BatchReport {
            window,
            started_at,
            outcomes,
            succeeded,
            failed,
        })
    }

    async fn refresh_status_gauges(&self) {
        match self.store.list_health_scores().await {
            Ok(scores) => {
                for grade in HealthGrade::ALL {
                    let count = scores.iter().filter(|s| s.status == grade).count();
                    metrics::set_status_count(grade, count);
                }
            }
            Err(e) => warn!(error = %e, "could not refresh status gauges"),
        }
    }
}
