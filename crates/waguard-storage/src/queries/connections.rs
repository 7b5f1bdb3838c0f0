// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection rows and their throttle columns.

use rusqlite::{OptionalExtension, params};
use waguard_core::{Connection, ConnectionId, GovernorError, ThrottleSettings};

use crate::database::Database;
use crate::models::{get_opt_ts, get_opt_u32, get_ts, opt_ts, ts};

const SELECT_CONNECTION: &str = "SELECT id, tenant_id, phone_number, registered_at, is_active,
        batch_size_override, delay_override_secs, campaigns_paused, warmup_paused,
        reconnect_blocked, reconnect_blocked_until
     FROM connections";

fn row_to_connection(row: &rusqlite::Row<'_>) -> rusqlite::Result<Connection> {
    Ok(Connection {
        id: ConnectionId(row.get(0)?),
        tenant_id: row.get(1)?,
        phone_number: row.get(2)?,
        registered_at: get_ts(row, 3)?,
        is_active: row.get(4)?,
        throttle: ThrottleSettings {
            batch_size_override: get_opt_u32(row, 5)?,
            delay_override_secs: get_opt_u32(row, 6)?,
            campaigns_paused: row.get(7)?,
            warmup_paused: row.get(8)?,
            reconnect_blocked: row.get(9)?,
            reconnect_blocked_until: get_opt_ts(row, 10)?,
        },
    })
}

/// Register a connection. Used by the platform importer and by tests.
pub async fn insert_connection(
    db: &Database,
    connection: &Connection,
) -> Result<(), GovernorError> {
    let c = connection.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO connections (id, tenant_id, phone_number, registered_at, is_active,
                    batch_size_override, delay_override_secs, campaigns_paused, warmup_paused,
                    reconnect_blocked, reconnect_blocked_until)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    c.id.0,
                    c.tenant_id,
                    c.phone_number,
                    ts(c.registered_at),
                    c.is_active,
                    c.throttle.batch_size_override.map(i64::from),
                    c.throttle.delay_override_secs.map(i64::from),
                    c.throttle.campaigns_paused,
                    c.throttle.warmup_paused,
                    c.throttle.reconnect_blocked,
                    opt_ts(c.throttle.reconnect_blocked_until),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a connection by id.
pub async fn get_connection(
    db: &Database,
    id: ConnectionId,
) -> Result<Option<Connection>, GovernorError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{SELECT_CONNECTION} WHERE id = ?1"),
                params![id.0],
                row_to_connection,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Ids of active connections, ascending.
pub async fn list_active_ids(db: &Database) -> Result<Vec<ConnectionId>, GovernorError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT id FROM connections WHERE is_active = 1 ORDER BY id")?;
            let rows = stmt.query_map([], |row| Ok(ConnectionId(row.get(0)?)))?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Overwrite the throttle columns. Fails with `QueryReturnedNoRows` for an unknown id.
pub fn write_throttle(
    conn: &rusqlite::Connection,
    id: ConnectionId,
    throttle: &ThrottleSettings,
) -> rusqlite::Result<()> {
    let changed = conn.execute(
        "UPDATE connections SET batch_size_override = ?2, delay_override_secs = ?3,
            campaigns_paused = ?4, warmup_paused = ?5, reconnect_blocked = ?6,
            reconnect_blocked_until = ?7
         WHERE id = ?1",
        params![
            id.0,
            throttle.batch_size_override.map(i64::from),
            throttle.delay_override_secs.map(i64::from),
            throttle.campaigns_paused,
            throttle.warmup_paused,
            throttle.reconnect_blocked,
            opt_ts(throttle.reconnect_blocked_until),
        ],
    )?;
    if changed == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    Ok(())
}
