// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; the binary installs the Prometheus recorder.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use waguard_core::{HealthGrade, TriggerType, WarmupState};

/// Register all governor metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "waguard_recomputes_total",
        "Health recomputes by outcome (ok or error kind)"
    );
    describe_counter!(
        "waguard_transitions_total",
        "Warmup state transitions by from, to and trigger"
    );
    describe_counter!("waguard_owner_actions_total", "Owner operations by action");
    describe_counter!("waguard_ledger_rows_total", "Ledger rows committed");
    describe_histogram!("waguard_health_score", "Computed health scores");
    describe_histogram!(
        "waguard_recompute_duration_seconds",
        "Wall time of a single connection recompute"
    );
    describe_gauge!(
        "waguard_connections_by_status",
        "Scored connections per health status after the last batch"
    );
    describe_gauge!("waguard_recalc_queue_depth", "Pending queued recalculations");
}

pub fn record_recompute(outcome: &str, seconds: f64) {
    metrics::counter!("waguard_recomputes_total", "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!("waguard_recompute_duration_seconds").record(seconds);
}

pub fn record_score(score: f64) {
    metrics::histogram!("waguard_health_score").record(score);
}

pub fn record_transition(from: WarmupState, to: WarmupState, trigger: TriggerType) {
    metrics::counter!(
        "waguard_transitions_total",
        "from" => from.to_string(),
        "to" => to.to_string(),
        "trigger" => trigger.to_string()
    )
    .increment(1);
}

pub fn record_owner_action(action: &'static str) {
    metrics::counter!("waguard_owner_actions_total", "action" => action).increment(1);
}

pub fn record_ledger_rows(rows: usize) {
    metrics::counter!("waguard_ledger_rows_total").increment(rows as u64);
}

pub fn set_status_count(status: HealthGrade, count: usize) {
    metrics::gauge!("waguard_connections_by_status", "status" => status.to_string())
        .set(count as f64);
}

pub fn set_queue_depth(depth: usize) {
    metrics::gauge!("waguard_recalc_queue_depth").set(depth as f64);
}
