// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod common;

use std::time::Duration;

use common::harness;
use tokio_util::sync::CancellationToken;
use waguard_core::{
    ConnectionId, ErrorKind, GovernorError, HealthGrade, Page, ScoreWindow, TrendDirection,
    WarmupState,
};
use waguard_governor::{OutcomeResult, RecalcQueue, RecalcRequest, RecalcResponse};
use waguard_test_utils::fixtures;

#[tokio::test]
async fn batch_isolates_connections_without_data() {
    let h = harness();
    for id in 1..=10 {
        let stats = if id == 4 {
            fixtures::silent()
        } else {
            fixtures::healthy()
        };
        h.add(id, 60, stats).await;
    }

    let report = h
        .governor
        .recalculate_all(ScoreWindow::Last24h)
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 10);
    assert_eq!(report.succeeded, 9);
    assert_eq!(report.failed, 1);
    let ids: Vec<i64> = report.outcomes.iter().map(|o| o.connection_id.0).collect();
    assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    assert!(matches!(
        report.outcome(ConnectionId(4)),
        Some(OutcomeResult::Failed {
            kind: ErrorKind::InsufficientData,
            ..
        })
    ));
    assert!(matches!(
        report.outcome(ConnectionId(5)),
        Some(OutcomeResult::Scored {
            status: HealthGrade::Excellent,
            ..
        })
    ));
}

#[tokio::test]
async fn batch_report_serializes_outcomes_flat() {
    let h = harness();
    h.add(1, 60, fixtures::healthy()).await;
    h.add(2, 60, fixtures::silent()).await;

    let report = h
        .governor
        .recalculate_all(ScoreWindow::Last24h)
        .await
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["window"], "24h");
    assert_eq!(json["outcomes"][0]["connection_id"], 1);
    assert_eq!(json["outcomes"][0]["outcome"], "scored");
    assert_eq!(json["outcomes"][0]["status"], "excellent");
    assert_eq!(json["outcomes"][1]["outcome"], "failed");
    assert_eq!(json["outcomes"][1]["kind"], "insufficient_data");
}

#[tokio::test]
async fn summary_counts_and_orders_attention() {
    let h = harness();
    let healthy = h.add(1, 60, fixtures::healthy()).await;
    let degraded = h.add(2, 60, fixtures::degraded()).await;
    let failing = h.add(3, 60, fixtures::failing()).await;
    h.add(4, 60, fixtures::silent()).await;
    h.governor
        .recalculate_all(ScoreWindow::Last24h)
        .await
        .unwrap();

    let summary = h.governor.summary().await.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.by_status.excellent, 1);
    assert_eq!(summary.by_status.warning, 1);
    assert_eq!(summary.by_status.critical, 1);
    let attention: Vec<ConnectionId> = summary
        .needs_attention
        .iter()
        .map(|a| a.connection_id)
        .collect();
    assert_eq!(attention, vec![failing, degraded]);
    assert!(!attention.contains(&healthy));
    assert!(summary.needs_attention[0].flags.reconnect_blocked);
}

#[tokio::test]
async fn detail_includes_throttle_and_open_blocks() {
    let h = harness();
    let id = h.add_in_state(1, WarmupState::Stable, fixtures::failing()).await;
    h.recompute(id).await;

    let detail = h.governor.connection_detail(id).await.unwrap();

    assert_eq!(detail.health.unwrap().score, 28.0);
    assert_eq!(detail.warmup.unwrap().state, WarmupState::Cooldown);
    assert!(detail.throttle.reconnect_blocked);
    assert_eq!(detail.open_blocks.len(), 4);

    let err = h
        .governor
        .connection_detail(ConnectionId(77))
        .await
        .unwrap_err();
    assert!(matches!(err, GovernorError::ConnectionNotFound { .. }));
}

#[tokio::test]
async fn trend_reflects_recent_history() {
    let h = harness();
    let id = h.add(1, 60, fixtures::healthy()).await;
    let sequence = [
        fixtures::healthy(),
        fixtures::healthy(),
        fixtures::failing(),
        fixtures::failing(),
    ];
    for stats in sequence {
        h.telemetry.set_stats(id, stats).await;
        h.recompute(id).await;
        h.clock.advance(chrono::Duration::hours(6));
    }

    let trend = h.governor.trend(id, Some(7)).await.unwrap();
    assert_eq!(trend.days, 7);
    assert_eq!(trend.points.len(), 4);
    assert_eq!(trend.direction, TrendDirection::Declining);

    // Older than the requested window.
    h.clock.advance(chrono::Duration::days(3));
    let trend = h.governor.trend(id, Some(1)).await.unwrap();
    assert!(trend.points.is_empty());
    assert_eq!(trend.direction, TrendDirection::Flat);
}

#[tokio::test]
async fn ledger_pages_are_newest_first() {
    let h = harness();
    let id = h.add(1, 60, fixtures::healthy()).await;
    h.recompute(id).await;

    let page = h
        .governor
        .state_history(id, Page::new(1, 1))
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].to_state, WarmupState::Stable);

    let limits = h.governor.limit_history(id, Page::default()).await.unwrap();
    assert_eq!(limits.total, 2);
    let blocks = h.governor.block_history(id, Page::default()).await.unwrap();
    assert_eq!(blocks.total, 0);

    let err = h
        .governor
        .block_history(ConnectionId(5), Page::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GovernorError::ConnectionNotFound { .. }));
}

#[tokio::test]
async fn execute_dispatches_single_and_batch() {
    let h = harness();
    let id = h.add(1, 60, fixtures::healthy()).await;

    let single = h
        .governor
        .execute(RecalcRequest {
            connection_id: Some(id),
            window: ScoreWindow::Last24h,
        })
        .await
        .unwrap();
    assert!(matches!(single, RecalcResponse::Single(ref s) if s.connection_id == id));

    let batch = h
        .governor
        .execute(RecalcRequest {
            connection_id: None,
            window: ScoreWindow::Last7d,
        })
        .await
        .unwrap();
    assert!(matches!(batch, RecalcResponse::Batch(ref r) if r.succeeded == 1));
}

#[tokio::test]
async fn queued_requests_are_worked_off() {
    let h = harness();
    let id = h.add(1, 60, fixtures::healthy()).await;
    let cancel = CancellationToken::new();
    let (queue, worker) = RecalcQueue::start(h.governor.clone(), 4, cancel.clone());

    queue
        .submit(RecalcRequest {
            connection_id: Some(id),
            window: ScoreWindow::Last24h,
        })
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while h.store.commits() == 0 {
        assert!(tokio::time::Instant::now() < deadline, "queued recompute never ran");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    cancel.cancel();
    worker.await.unwrap();
    let err = queue
        .submit(RecalcRequest {
            connection_id: Some(id),
            window: ScoreWindow::Last24h,
        })
        .unwrap_err();
    assert!(matches!(err, GovernorError::Internal(_)));
}

#[tokio::test]
async fn full_queue_rejects_submissions() {
    let h = harness();
    let id = h.add(1, 60, fixtures::healthy()).await;
    h.telemetry.set_delay(Some(Duration::from_millis(200))).await;
    let cancel = CancellationToken::new();
    let (queue, _worker) = RecalcQueue::start(h.governor.clone(), 1, cancel.clone());

    let request = RecalcRequest {
        connection_id: Some(id),
        window: ScoreWindow::Last24h,
    };
    let results: Vec<_> = (0..4).map(|_| queue.submit(request)).collect();
    assert!(results.iter().any(Result::is_err));
    cancel.cancel();
}
