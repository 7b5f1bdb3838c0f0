// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic batch recompute.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use waguard_core::{ErrorKind, ScoreWindow};
use waguard_governor::{BatchReport, Governor, OutcomeResult};

/// Run `recalculate_all` every `every` until `cancel` fires.
///
/// The first batch runs immediately. A tick that arrives while a batch is
/// still running is skipped rather than queued.
pub async fn run_scheduler(
    governor: Arc<Governor>,
    every: Duration,
    window: ScoreWindow,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    info!(interval_secs = every.as_secs(), %window, "scheduler started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let batch = governor.recalculate_all(window);
                tokio::select! {
                    result = batch => match result {
                        Ok(report) => {
                            let failed = hard_failures(&report);
                            if failed > 0 {
                                warn!(
                                    succeeded = report.succeeded,
                                    failed,
                                    "scheduled batch had failures"
                                );
                            }
                        }
                        Err(e) => warn!(error = %e, "scheduled batch could not run"),
                    },
                    _ = cancel.cancelled() => {
                        info!("scheduler cancelled mid-batch");
                        break;
                    }
                }
            }
            _ = cancel.cancelled() => {
                info!("scheduler shutting down");
                break;
            }
        }
    }
}

/// Failed outcomes, not counting connections that had no traffic to score.
fn hard_failures(report: &BatchReport) -> usize {
    report
        .outcomes
        .iter()
        .filter(|o| {
            matches!(
                &o.result,
                OutcomeResult::Failed { kind, .. } if *kind != ErrorKind::InsufficientData
            )
        })
        .count()
}
