// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for connections and message stats.

use chrono::{DateTime, Duration, Utc};
use waguard_core::{Connection, ConnectionId, MessageStats, ThrottleSettings};

/// An active connection registered `age_days` before `now`.
pub fn connection(id: i64, age_days: i64, now: DateTime<Utc>) -> Connection {
    Connection {
        id: ConnectionId(id),
        tenant_id: 1,
        phone_number: format!("+1555{id:07}"),
        registered_at: now - Duration::days(age_days),
        is_active: true,
        throttle: ThrottleSettings::default(),
    }
}

/// Evenly spread sends with the given delivered and failed counts.
pub fn stats(sent: u64, delivered: u64, failed: u64) -> MessageStats {
    let per_hour = sent / 24;
    let mut hourly_sends = vec![per_hour; 24];
    hourly_sends[0] += sent - per_hour * 24;
    MessageStats {
        sent,
        delivered,
        failed,
        read: delivered / 2,
        user_signals: None,
        hourly_sends,
        template_sends: Vec::new(),
    }
}

/// 98% delivered, no failures; scores 98.4 (excellent).
pub fn healthy() -> MessageStats {
    stats(1000, 980, 0)
}

/// 40% failed; scores 28.0 (critical).
pub fn failing() -> MessageStats {
    stats(1000, 600, 400)
}

/// 80% delivered, 8% failed; scores 64.8 (warning).
pub fn degraded() -> MessageStats {
    stats(1000, 800, 80)
}

/// Nothing sent in the window.
pub fn silent() -> MessageStats {
    MessageStats {
        hourly_sends: vec![0; 24],
        ..MessageStats::default()
    }
}
