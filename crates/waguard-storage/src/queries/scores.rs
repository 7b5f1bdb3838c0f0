// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Current health scores and the append-only score history.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use waguard_core::{
    ActionFlags, ConnectionId, GovernorError, HealthHistoryPoint, HealthScore, SubScores,
};

use crate::database::Database;
use crate::models::{get_enum, get_ts, get_u64, ts};

const SELECT_SCORE: &str = "SELECT connection_id, score, status, delivery_rate, failure_rate,
        delivery_score, failure_score, user_signal_score, pattern_score, template_score,
        batch_size_reduced, delay_added, campaign_paused, warmup_paused, reconnect_blocked,
        score_window, messages_sent, calculated_at
     FROM health_scores";

fn row_to_score(row: &rusqlite::Row<'_>) -> rusqlite::Result<HealthScore> {
    Ok(HealthScore {
        connection_id: ConnectionId(row.get(0)?),
        score: row.get(1)?,
        status: get_enum(row, 2)?,
        delivery_rate: row.get(3)?,
        failure_rate: row.get(4)?,
        sub_scores: SubScores {
            delivery: row.get(5)?,
            failure: row.get(6)?,
            user_signal: row.get(7)?,
            pattern: row.get(8)?,
            template_mix: row.get(9)?,
        },
        flags: ActionFlags {
            batch_size_reduced: row.get(10)?,
            delay_added: row.get(11)?,
            campaign_paused: row.get(12)?,
            warmup_paused: row.get(13)?,
            reconnect_blocked: row.get(14)?,
        },
        window: get_enum(row, 15)?,
        messages_sent: get_u64(row, 16)?,
        calculated_at: get_ts(row, 17)?,
    })
}

/// Insert or overwrite the current score for a connection.
pub fn upsert_score(conn: &rusqlite::Connection, s: &HealthScore) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO health_scores (connection_id, score, status, delivery_rate, failure_rate,
            delivery_score, failure_score, user_signal_score, pattern_score, template_score,
            batch_size_reduced, delay_added, campaign_paused, warmup_paused, reconnect_blocked,
            score_window, messages_sent, calculated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
         ON CONFLICT(connection_id) DO UPDATE SET
            score = excluded.score, status = excluded.status,
            delivery_rate = excluded.delivery_rate, failure_rate = excluded.failure_rate,
            delivery_score = excluded.delivery_score, failure_score = excluded.failure_score,
            user_signal_score = excluded.user_signal_score,
            pattern_score = excluded.pattern_score, template_score = excluded.template_score,
            batch_size_reduced = excluded.batch_size_reduced,
            delay_added = excluded.delay_added, campaign_paused = excluded.campaign_paused,
            warmup_paused = excluded.warmup_paused,
            reconnect_blocked = excluded.reconnect_blocked,
            score_window = excluded.score_window, messages_sent = excluded.messages_sent,
            calculated_at = excluded.calculated_at",
        params![
            s.connection_id.0,
            s.score,
            s.status.as_ref(),
            s.delivery_rate,
            s.failure_rate,
            s.sub_scores.delivery,
            s.sub_scores.failure,
            s.sub_scores.user_signal,
            s.sub_scores.pattern,
            s.sub_scores.template_mix,
            s.flags.batch_size_reduced,
            s.flags.delay_added,
            s.flags.campaign_paused,
            s.flags.warmup_paused,
            s.flags.reconnect_blocked,
            s.window.as_ref(),
            s.messages_sent as i64,
            ts(s.calculated_at),
        ],
    )?;
    Ok(())
}

pub fn get_score(
    conn: &rusqlite::Connection,
    id: ConnectionId,
) -> rusqlite::Result<Option<HealthScore>> {
    conn.query_row(
        &format!("{SELECT_SCORE} WHERE connection_id = ?1"),
        params![id.0],
        row_to_score,
    )
    .optional()
}

/// Every current score, by connection id.
pub async fn list_scores(db: &Database) -> Result<Vec<HealthScore>, GovernorError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_SCORE} ORDER BY connection_id"))?;
            let rows = stmt.query_map([], row_to_score)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub fn insert_history(conn: &rusqlite::Connection, p: &HealthHistoryPoint) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO health_score_history (connection_id, score, status, score_window, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            p.connection_id.0,
            p.score,
            p.status.as_ref(),
            p.window.as_ref(),
            ts(p.recorded_at),
        ],
    )?;
    Ok(())
}

/// History points at or after `since`, oldest first.
pub async fn history_since(
    db: &Database,
    id: ConnectionId,
    since: DateTime<Utc>,
) -> Result<Vec<HealthHistoryPoint>, GovernorError> {
    let since = ts(since);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT connection_id, score, status, score_window, recorded_at
                 FROM health_score_history
                 WHERE connection_id = ?1 AND recorded_at >= ?2
                 ORDER BY recorded_at, id",
            )?;
            let rows = stmt.query_map(params![id.0, since], |row| {
                Ok(HealthHistoryPoint {
                    connection_id: ConnectionId(row.get(0)?),
                    score: row.get(1)?,
                    status: get_enum(row, 2)?,
                    window: get_enum(row, 3)?,
                    recorded_at: get_ts(row, 4)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
