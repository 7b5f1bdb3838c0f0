// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the SQLite store through the collaborator traits.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::tempdir;
use waguard_config::model::StorageConfig;
use waguard_core::{
    ActionFlags, BlockChange, BlockType, Changeset, Connection, ConnectionId, ConnectionStore,
    GovernorStore, HealthGrade, HealthHistoryPoint, HealthScore, ScoreWindow, SubScores,
    TelemetrySource, ThrottleSettings, Warmup, WarmupAutoBlock, WarmupState,
};
use waguard_storage::{DeliveryStatus, MessageEvent, SqliteStore};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 10, 9, 0, 0).unwrap()
}

async fn store(dir: &tempfile::TempDir) -> SqliteStore {
    let path = dir.path().join("waguard.db");
    let store = SqliteStore::new(StorageConfig {
        database_path: path.to_str().unwrap().to_string(),
        wal_mode: true,
    });
    store.initialize().await.unwrap();
    store
        .insert_connection(&Connection {
            id: ConnectionId(7),
            tenant_id: 3,
            phone_number: "+15550000007".into(),
            registered_at: now() - Duration::days(40),
            is_active: true,
            throttle: ThrottleSettings::default(),
        })
        .await
        .unwrap();
    store
}

fn score(value: f64, at: DateTime<Utc>) -> HealthScore {
    HealthScore {
        connection_id: ConnectionId(7),
        score: value,
        status: HealthGrade::Warning,
        delivery_rate: 80.0,
        failure_rate: 8.0,
        sub_scores: SubScores {
            delivery: 60.0,
            failure: 55.0,
            user_signal: 100.0,
            pattern: 100.0,
            template_mix: 100.0,
        },
        flags: ActionFlags {
            batch_size_reduced: true,
            delay_added: true,
            ..ActionFlags::default()
        },
        window: ScoreWindow::Last24h,
        messages_sent: 500,
        calculated_at: at,
    }
}

fn warmup(state: WarmupState) -> Warmup {
    Warmup {
        connection_id: ConnectionId(7),
        state,
        current_daily_limit: 25,
        current_hourly_limit: 5,
        sent_today: 0,
        force_cooldown: false,
        cooldown_until: Some(now() + Duration::hours(24)),
        number_age_days: 40,
        last_health_score: Some(52.0),
        last_health_status: Some(HealthGrade::Warning),
        state_changed_at: now(),
        updated_at: now(),
    }
}

#[tokio::test]
async fn snapshot_reflects_committed_changeset() {
    let dir = tempdir().unwrap();
    let store = store(&dir).await;
    let id = ConnectionId(7);

    let empty = store.load_snapshot(id).await.unwrap();
    assert!(empty.health.is_none() && empty.warmup.is_none());

    let mut cs = Changeset::new(id);
    cs.health = Some(score(52.0, now()));
    cs.history = Some(HealthHistoryPoint {
        connection_id: id,
        score: 52.0,
        status: HealthGrade::Warning,
        window: ScoreWindow::Last24h,
        recorded_at: now(),
    });
    cs.warmup = Some(warmup(WarmupState::Cooldown));
    cs.throttle = Some(ThrottleSettings {
        batch_size_override: Some(10),
        delay_override_secs: Some(30),
        ..ThrottleSettings::default()
    });
    cs.blocks.push(BlockChange::Open(WarmupAutoBlock::open(
        id,
        BlockType::Cooldown,
        "health_drop",
        now(),
        Some(now() + Duration::hours(24)),
    )));
    store.commit(cs).await.unwrap();

    let snapshot = store.load_snapshot(id).await.unwrap();
    assert_eq!(snapshot.health, Some(score(52.0, now())));
    assert_eq!(snapshot.warmup, Some(warmup(WarmupState::Cooldown)));
    assert!(snapshot.has_open_block(BlockType::Cooldown));

    let conn = store.get_connection(id).await.unwrap().unwrap();
    assert_eq!(conn.throttle.batch_size_override, Some(10));

    // overwrite keeps one current row and appends history
    let mut cs = Changeset::new(id);
    cs.health = Some(score(61.0, now() + Duration::minutes(15)));
    cs.history = Some(HealthHistoryPoint {
        connection_id: id,
        score: 61.0,
        status: HealthGrade::Warning,
        window: ScoreWindow::Last24h,
        recorded_at: now() + Duration::minutes(15),
    });
    store.commit(cs).await.unwrap();

    let scores = store.list_health_scores().await.unwrap();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].score, 61.0);
    let history = store.health_history(id, now() - Duration::days(1)).await.unwrap();
    assert_eq!(history.iter().map(|p| p.score).collect::<Vec<_>>(), vec![52.0, 61.0]);

    store.close().await.unwrap();
}

#[tokio::test]
async fn telemetry_through_trait() {
    let dir = tempdir().unwrap();
    let store = store(&dir).await;
    let id = ConnectionId(7);
    let start = now() - Duration::hours(24);
    for i in 0..10 {
        let status = if i < 8 {
            DeliveryStatus::Delivered
        } else {
            DeliveryStatus::Failed
        };
        store
            .record_message_event(
                &MessageEvent::new(id, status, start + Duration::hours(i)).with_template("welcome"),
            )
            .await
            .unwrap();
    }

    let stats = store.message_stats(id, start, now()).await.unwrap();
    assert_eq!(stats.sent, 10);
    assert_eq!(stats.delivered, 8);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.template_sends, vec![10]);
    assert_eq!(stats.hourly_sends.iter().sum::<u64>(), 10);
    assert_eq!(stats.hourly_sends.len(), 24);

    assert_eq!(store.list_connection_ids().await.unwrap(), vec![id]);
    store.close().await.unwrap();
}
