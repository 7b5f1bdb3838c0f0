// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use waguard_config::WaguardConfig;
use waguard_core::{
    ActionFlags, ConnectionId, HealthGrade, HealthScore, MessageStats, ScoreWindow, SubScores,
    Warmup, WarmupState,
};
use waguard_governor::{Collaborators, Governor};
use waguard_test_utils::{fixtures, ManualClock, MemoryStore, MockTelemetry};

pub struct Harness {
    pub governor: Arc<Governor>,
    pub store: Arc<MemoryStore>,
    pub telemetry: Arc<MockTelemetry>,
    pub clock: Arc<ManualClock>,
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
}

pub fn harness() -> Harness {
    harness_with(|g| g)
}

pub fn harness_with(tune: impl FnOnce(Governor) -> Governor) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let telemetry = Arc::new(MockTelemetry::new());
    let clock = Arc::new(ManualClock::new(start()));
    let governor = Governor::new(
        &WaguardConfig::default(),
        Collaborators {
            telemetry: telemetry.clone(),
            connections: store.clone(),
            store: store.clone(),
            clock: clock.clone(),
        },
    );
    Harness {
        governor: Arc::new(tune(governor)),
        store,
        telemetry,
        clock,
    }
}

impl Harness {
    /// Register a connection of `age_days` that sends `stats`.
    pub async fn add(&self, id: i64, age_days: i64, stats: MessageStats) -> ConnectionId {
        self.store
            .insert_connection(fixtures::connection(id, age_days, start()))
            .await;
        self.telemetry.set_stats(ConnectionId(id), stats).await;
        ConnectionId(id)
    }

    /// Register a connection already in `state`.
    pub async fn add_in_state(
        &self,
        id: i64,
        state: WarmupState,
        stats: MessageStats,
    ) -> ConnectionId {
        let id = self.add(id, 60, stats).await;
        self.store.put_warmup(warmup(id, state)).await;
        id
    }

    pub async fn recompute(&self, id: ConnectionId) -> HealthScore {
        self.governor
            .recalculate(id, ScoreWindow::Last24h)
            .await
            .unwrap()
    }
}

pub fn warmup(id: ConnectionId, state: WarmupState) -> Warmup {
    let (daily, hourly) = match state {
        WarmupState::New => (20, 5),
        WarmupState::Warming => (800, 120),
        WarmupState::Stable => (1000, 150),
        WarmupState::Cooldown => (25, 5),
        WarmupState::Suspended => (0, 0),
    };
    Warmup {
        connection_id: id,
        state,
        current_daily_limit: daily,
        current_hourly_limit: hourly,
        sent_today: 0,
        force_cooldown: false,
        cooldown_until: (state == WarmupState::Cooldown)
            .then(|| start() + chrono::Duration::hours(24)),
        number_age_days: 60,
        last_health_score: None,
        last_health_status: None,
        state_changed_at: start() - chrono::Duration::days(10),
        updated_at: start() - chrono::Duration::days(1),
    }
}

/// A stored current score, for seeding owner-action gates.
pub fn score_record(
    id: ConnectionId,
    score: f64,
    status: HealthGrade,
    flags: ActionFlags,
) -> HealthScore {
    HealthScore {
        connection_id: id,
        score,
        status,
        delivery_rate: 90.0,
        failure_rate: 2.0,
        sub_scores: SubScores::default(),
        flags,
        window: ScoreWindow::Last24h,
        messages_sent: 500,
        calculated_at: start() - chrono::Duration::hours(1),
    }
}
