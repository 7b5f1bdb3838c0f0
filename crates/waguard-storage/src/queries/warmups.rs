// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection warmup records.

use rusqlite::{OptionalExtension, params};
use waguard_core::{ConnectionId, Warmup};

use crate::models::{get_enum, get_opt_enum, get_opt_ts, get_ts, get_u32, opt_ts, ts};

pub fn upsert_warmup(conn: &rusqlite::Connection, w: &Warmup) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO warmups (connection_id, state, current_daily_limit, current_hourly_limit,
            sent_today, force_cooldown, cooldown_until, number_age_days, last_health_score,
            last_health_status, state_changed_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(connection_id) DO UPDATE SET
            state = excluded.state,
            current_daily_limit = excluded.current_daily_limit,
            current_hourly_limit = excluded.current_hourly_limit,
            sent_today = excluded.sent_today,
            force_cooldown = excluded.force_cooldown,
            cooldown_until = excluded.cooldown_until,
            number_age_days = excluded.number_age_days,
            last_health_score = excluded.last_health_score,
            last_health_status = excluded.last_health_status,
            state_changed_at = excluded.state_changed_at,
            updated_at = excluded.updated_at",
        params![
            w.connection_id.0,
            w.state.as_ref(),
            i64::from(w.current_daily_limit),
            i64::from(w.current_hourly_limit),
            i64::from(w.sent_today),
            w.force_cooldown,
            opt_ts(w.cooldown_until),
            i64::from(w.number_age_days),
            w.last_health_score,
            w.last_health_status.map(|s| s.as_ref().to_string()),
            ts(w.state_changed_at),
            ts(w.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_warmup(
    conn: &rusqlite::Connection,
    id: ConnectionId,
) -> rusqlite::Result<Option<Warmup>> {
    conn.query_row(
        "SELECT connection_id, state, current_daily_limit, current_hourly_limit, sent_today,
                force_cooldown, cooldown_until, number_age_days, last_health_score,
                last_health_status, state_changed_at, updated_at
         FROM warmups WHERE connection_id = ?1",
        params![id.0],
        |row| {
            Ok(Warmup {
                connection_id: ConnectionId(row.get(0)?),
                state: get_enum(row, 1)?,
                current_daily_limit: get_u32(row, 2)?,
                current_hourly_limit: get_u32(row, 3)?,
                sent_today: get_u32(row, 4)?,
                force_cooldown: row.get(5)?,
                cooldown_until: get_opt_ts(row, 6)?,
                number_age_days: get_u32(row, 7)?,
                last_health_score: row.get(8)?,
                last_health_status: get_opt_enum(row, 9)?,
                state_changed_at: get_ts(row, 10)?,
                updated_at: get_ts(row, 11)?,
            })
        },
    )
    .optional()
}
