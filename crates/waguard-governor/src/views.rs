// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-side views for the admin surface.

use chrono::{DateTime, Utc};
use serde::Serialize;
use waguard_core::{
    ActionFlags, ConnectionId, GovernorError, HealthGrade, HealthScore, Page, Paged,
    ThrottleSettings, Warmup, WarmupAutoBlock, WarmupLimitChange, WarmupStateEvent,
};
use waguard_health::Trend;

use crate::service::Governor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub excellent: usize,
    pub good: usize,
    pub warning: usize,
    pub critical: usize,
}

impl StatusCounts {
    fn add(&mut self, grade: HealthGrade) {
        match grade {
            HealthGrade::Excellent => self.excellent += 1,
            HealthGrade::Good => self.good += 1,
            HealthGrade::Warning => self.warning += 1,
            HealthGrade::Critical => self.critical += 1,
        }
    }
}

/// A scored connection below the good threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttentionItem {
    pub connection_id: ConnectionId,
    pub score: f64,
    pub status: HealthGrade,
    pub flags: ActionFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSummary {
    /// Connections with a current score.
    pub total: usize,
    pub by_status: StatusCounts,
    /// Lowest score first.
    pub needs_attention: Vec<AttentionItem>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionDetail {
    pub connection_id: ConnectionId,
    pub health: Option<HealthScore>,
    pub warmup: Option<Warmup>,
    pub throttle: ThrottleSettings,
    pub open_blocks: Vec<WarmupAutoBlock>,
}

impl Governor {
    pub async fn summary(&self) -> Result<HealthSummary, GovernorError> {
        let scores = self.store.list_health_scores().await?;
        let good = self.calculator.good_threshold();

        let mut by_status = StatusCounts::default();
        let mut needs_attention = Vec::new();
        for s in &scores {
            by_status.add(s.status);
            if s.score < good {
                needs_attention.push(AttentionItem {
                    connection_id: s.connection_id,
                    score: s.score,
                    status: s.status,
                    flags: s.flags,
                });
            }
        }
        needs_attention.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then(a.connection_id.cmp(&b.connection_id))
        });

        Ok(HealthSummary {
            total: scores.len(),
            by_status,
            needs_attention,
            generated_at: self.clock.now(),
        })
    }

    pub async fn connection_detail(
        &self,
        id: ConnectionId,
    ) -> Result<ConnectionDetail, GovernorError> {
        let connection = self.connection(id).await?;
        let snapshot = self.store.load_snapshot(id).await?;
        Ok(ConnectionDetail {
            connection_id: id,
            health: snapshot.health,
            warmup: snapshot.warmup,
            throttle: connection.throttle,
            open_blocks: snapshot.open_blocks,
        })
    }

    /// Score history for the last `days` (defaulted and clamped) with its direction.
    pub async fn trend(&self, id: ConnectionId, days: Option<u32>) -> Result<Trend, GovernorError> {
        self.connection(id).await?;
        let days = self.trends.clamp_days(days);
        let since = self.clock.now() - chrono::Duration::days(i64::from(days));
        let points = self.store.health_history(id, since).await?;
        Ok(self.trends.analyze(days, points))
    }

    pub async fn state_history(
        &self,
        id: ConnectionId,
        page: Page,
    ) -> Result<Paged<WarmupStateEvent>, GovernorError> {
        self.connection(id).await?;
        self.store.state_events(id, page).await
    }

    pub async fn limit_history(
        &self,
        id: ConnectionId,
        page: Page,
    ) -> Result<Paged<WarmupLimitChange>, GovernorError> {
        self.connection(id).await?;
        self.store.limit_changes(id, page).await
    }

    pub async fn block_history(
        &self,
        id: ConnectionId,
        page: Page,
    ) -> Result<Paged<WarmupAutoBlock>, GovernorError> {
        self.connection(id).await?;
        self.store.auto_blocks(id, page).await
    }
}
