// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The append-only ledger and the atomic changeset commit.
//!
//! State events, limit changes, and score history are insert-only; the
//! schema rejects updates and deletes with triggers. Auto-blocks may only be
//! resolved once and have their blocked-message counter raised.

use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::{debug, warn};
use waguard_core::{
    BlockChange, BlockResolution, BlockType, Changeset, ConnectionId, GovernorError, Page, Paged,
    Snapshot, WarmupAutoBlock, WarmupLimitChange, WarmupStateEvent,
};

use crate::database::Database;
use crate::models::{get_enum, get_opt_enum, get_opt_ts, get_ts, get_u32, get_u64, opt_ts, ts};
use crate::queries::{connections, scores, warmups};

fn insert_state_event(conn: &rusqlite::Connection, e: &WarmupStateEvent) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO warmup_state_events (connection_id, from_state, to_state, trigger_type,
            health_score_at_event, actor_id, actor_role, reason, is_override, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            e.connection_id.0,
            e.from_state.as_ref(),
            e.to_state.as_ref(),
            e.trigger_type.as_ref(),
            e.health_score_at_event,
            e.actor_id,
            e.actor_role.as_ref(),
            e.reason,
            e.is_override,
            ts(e.created_at),
        ],
    )?;
    Ok(())
}

fn insert_limit_change(conn: &rusqlite::Connection, c: &WarmupLimitChange) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO warmup_limit_changes (connection_id, limit_type, old_value, new_value,
            reason, warmup_state_at_change, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            c.connection_id.0,
            c.limit_type.as_ref(),
            i64::from(c.old_value),
            i64::from(c.new_value),
            c.reason,
            c.warmup_state_at_change.as_ref(),
            ts(c.created_at),
        ],
    )?;
    Ok(())
}

fn open_block(conn: &rusqlite::Connection, b: &WarmupAutoBlock) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO warmup_auto_blocks (connection_id, block_type, severity, trigger_event,
            blocked_at, blocked_until, is_resolved, resolved_at, resolved_by_type, messages_blocked)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            b.connection_id.0,
            b.block_type.as_ref(),
            b.severity.as_ref(),
            b.trigger_event,
            ts(b.blocked_at),
            opt_ts(b.blocked_until),
            b.is_resolved,
            opt_ts(b.resolved_at),
            b.resolved_by_type.map(|r| r.as_ref().to_string()),
            b.messages_blocked as i64,
        ],
    )?;
    Ok(())
}

fn resolve_blocks(
    conn: &rusqlite::Connection,
    id: ConnectionId,
    r: &BlockResolution,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE warmup_auto_blocks
         SET is_resolved = 1, resolved_at = ?3, resolved_by_type = ?4
         WHERE connection_id = ?1 AND block_type = ?2 AND is_resolved = 0",
        params![
            id.0,
            r.block_type.as_ref(),
            ts(r.resolved_at),
            r.resolved_by.as_ref(),
        ],
    )
}

const SELECT_BLOCK: &str = "SELECT id, connection_id, block_type, severity, trigger_event,
        blocked_at, blocked_until, is_resolved, resolved_at, resolved_by_type, messages_blocked
     FROM warmup_auto_blocks";

fn row_to_block(row: &rusqlite::Row<'_>) -> rusqlite::Result<WarmupAutoBlock> {
    Ok(WarmupAutoBlock {
        id: Some(row.get(0)?),
        connection_id: ConnectionId(row.get(1)?),
        block_type: get_enum(row, 2)?,
        severity: get_enum(row, 3)?,
        trigger_event: row.get(4)?,
        blocked_at: get_ts(row, 5)?,
        blocked_until: get_opt_ts(row, 6)?,
        is_resolved: row.get(7)?,
        resolved_at: get_opt_ts(row, 8)?,
        resolved_by_type: get_opt_enum(row, 9)?,
        messages_blocked: get_u64(row, 10)?,
    })
}

fn row_to_state_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<WarmupStateEvent> {
    Ok(WarmupStateEvent {
        id: Some(row.get(0)?),
        connection_id: ConnectionId(row.get(1)?),
        from_state: get_enum(row, 2)?,
        to_state: get_enum(row, 3)?,
        trigger_type: get_enum(row, 4)?,
        health_score_at_event: row.get(5)?,
        actor_id: row.get(6)?,
        actor_role: get_enum(row, 7)?,
        reason: row.get(8)?,
        is_override: row.get(9)?,
        created_at: get_ts(row, 10)?,
    })
}

fn row_to_limit_change(row: &rusqlite::Row<'_>) -> rusqlite::Result<WarmupLimitChange> {
    Ok(WarmupLimitChange {
        id: Some(row.get(0)?),
        connection_id: ConnectionId(row.get(1)?),
        limit_type: get_enum(row, 2)?,
        old_value: get_u32(row, 3)?,
        new_value: get_u32(row, 4)?,
        reason: row.get(5)?,
        warmup_state_at_change: get_enum(row, 6)?,
        created_at: get_ts(row, 7)?,
    })
}

/// Read the pre-operation view of a connection.
pub async fn load_snapshot(db: &Database, id: ConnectionId) -> Result<Snapshot, GovernorError> {
    db.connection()
        .call(move |conn| {
            let health = scores::get_score(conn, id)?;
            let warmup = warmups::get_warmup(conn, id)?;
            let mut stmt = conn.prepare(&format!(
                "{SELECT_BLOCK} WHERE connection_id = ?1 AND is_resolved = 0 ORDER BY id"
            ))?;
            let open_blocks = stmt
                .query_map(params![id.0], row_to_block)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Snapshot {
                health,
                warmup,
                open_blocks,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn apply(conn: &mut rusqlite::Connection, cs: &Changeset) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    if let Some(health) = &cs.health {
        scores::upsert_score(&tx, health)?;
    }
    if let Some(point) = &cs.history {
        scores::insert_history(&tx, point)?;
    }
    if let Some(warmup) = &cs.warmup {
        warmups::upsert_warmup(&tx, warmup)?;
    }
    if let Some(throttle) = &cs.throttle {
        connections::write_throttle(&tx, cs.connection_id, throttle)?;
    }
    for event in &cs.state_events {
        insert_state_event(&tx, event)?;
    }
    for change in &cs.limit_changes {
        insert_limit_change(&tx, change)?;
    }
    for block in &cs.blocks {
        match block {
            BlockChange::Open(b) => open_block(&tx, b)?,
            BlockChange::Resolve(r) => {
                let resolved = resolve_blocks(&tx, cs.connection_id, r)?;
                if resolved == 0 {
                    debug!(
                        connection_id = %cs.connection_id,
                        block_type = %r.block_type,
                        "no open block to resolve"
                    );
                }
            }
        }
    }
    tx.commit()
}

/// Apply a changeset in one transaction. Any failure rolls back every row.
pub async fn commit(db: &Database, changeset: Changeset) -> Result<(), GovernorError> {
    let connection_id = changeset.connection_id;
    let rows = changeset.ledger_rows();
    db.connection()
        .call(move |conn| apply(conn, &changeset))
        .await
        .map_err(|e| {
            warn!(%connection_id, error = %e, "changeset commit failed");
            GovernorError::LedgerWriteFailed {
                connection_id,
                source: Box::new(e),
            }
        })?;
    debug!(%connection_id, ledger_rows = rows, "changeset committed");
    Ok(())
}

fn paged<T, F>(
    conn: &rusqlite::Connection,
    table: &str,
    select: &str,
    order: &str,
    id: ConnectionId,
    page: Page,
    map: F,
) -> rusqlite::Result<Paged<T>>
where
    F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
{
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE connection_id = ?1"),
        params![id.0],
        |row| row.get(0),
    )?;
    let mut stmt = conn.prepare(&format!(
        "{select} WHERE connection_id = ?1 ORDER BY {order} LIMIT ?2 OFFSET ?3"
    ))?;
    let items = stmt
        .query_map(
            params![id.0, i64::from(page.per_page), page.offset() as i64],
            map,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Paged {
        items,
        page: page.page,
        per_page: page.per_page,
        total: total.max(0) as u64,
    })
}

/// State events, newest first.
pub async fn state_events(
    db: &Database,
    id: ConnectionId,
    page: Page,
) -> Result<Paged<WarmupStateEvent>, GovernorError> {
    db.connection()
        .call(move |conn| {
            paged(
                conn,
                "warmup_state_events",
                "SELECT id, connection_id, from_state, to_state, trigger_type,
                        health_score_at_event, actor_id, actor_role, reason, is_override, created_at
                 FROM warmup_state_events",
                "created_at DESC, id DESC",
                id,
                page,
                row_to_state_event,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Limit changes, newest first.
pub async fn limit_changes(
    db: &Database,
    id: ConnectionId,
    page: Page,
) -> Result<Paged<WarmupLimitChange>, GovernorError> {
    db.connection()
        .call(move |conn| {
            paged(
                conn,
                "warmup_limit_changes",
                "SELECT id, connection_id, limit_type, old_value, new_value, reason,
                        warmup_state_at_change, created_at
                 FROM warmup_limit_changes",
                "created_at DESC, id DESC",
                id,
                page,
                row_to_limit_change,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Auto-blocks, open and resolved, newest first.
pub async fn auto_blocks(
    db: &Database,
    id: ConnectionId,
    page: Page,
) -> Result<Paged<WarmupAutoBlock>, GovernorError> {
    db.connection()
        .call(move |conn| {
            paged(
                conn,
                "warmup_auto_blocks",
                SELECT_BLOCK,
                "blocked_at DESC, id DESC",
                id,
                page,
                row_to_block,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Automatic HEALTH_DROP transitions into COOLDOWN at or after `since`.
pub async fn count_health_drop_cooldowns_since(
    db: &Database,
    id: ConnectionId,
    since: DateTime<Utc>,
) -> Result<u32, GovernorError> {
    let since = ts(since);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM warmup_state_events
                 WHERE connection_id = ?1 AND trigger_type = 'health_drop'
                   AND to_state = 'cooldown' AND created_at >= ?2",
                params![id.0, since],
                |row| get_u32(row, 0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Raise the counter on the open block of `block_type`. `false` when none is open.
pub async fn record_blocked_messages(
    db: &Database,
    id: ConnectionId,
    block_type: BlockType,
    count: u64,
) -> Result<bool, GovernorError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE warmup_auto_blocks SET messages_blocked = messages_blocked + ?3
                 WHERE connection_id = ?1 AND block_type = ?2 AND is_resolved = 0",
                params![id.0, block_type.as_ref(), count as i64],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
