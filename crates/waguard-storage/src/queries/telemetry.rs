// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log writes and windowed aggregation.

use chrono::{DateTime, Utc};
use rusqlite::params;
use waguard_core::{ConnectionId, GovernorError, MessageStats, UserSignals};

use crate::database::Database;
use crate::models::{MessageEvent, get_u64, ts};

/// Append one message outcome to the log.
pub async fn record_message_event(
    db: &Database,
    event: &MessageEvent,
) -> Result<(), GovernorError> {
    let e = event.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO message_events
                    (connection_id, template, status, user_blocked, user_reported, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    e.connection_id.0,
                    e.template,
                    e.status.as_ref(),
                    e.user_blocked,
                    e.user_reported,
                    ts(e.sent_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of hour buckets covering `[start, end)`.
fn bucket_count(start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
    let secs = (end - start).num_seconds().max(0);
    ((secs + 3599) / 3600) as usize
}

/// Aggregate the log for one connection over `[start, end)`.
pub async fn message_stats(
    db: &Database,
    id: ConnectionId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<MessageStats, GovernorError> {
    let (from, to) = (ts(start), ts(end));
    let buckets = bucket_count(start, end);
    db.connection()
        .call(move |conn| {
            let (sent, delivered, read, failed, signal_rows, blocked, reported) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(status IN ('delivered', 'read')), 0),
                        COALESCE(SUM(status = 'read'), 0),
                        COALESCE(SUM(status = 'failed'), 0),
                        COALESCE(SUM(user_blocked IS NOT NULL OR user_reported IS NOT NULL), 0),
                        COALESCE(SUM(COALESCE(user_blocked, 0)), 0),
                        COALESCE(SUM(COALESCE(user_reported, 0)), 0)
                 FROM message_events
                 WHERE connection_id = ?1 AND sent_at >= ?2 AND sent_at < ?3",
                params![id.0, from, to],
                |row| {
                    Ok((
                        get_u64(row, 0)?,
                        get_u64(row, 1)?,
                        get_u64(row, 2)?,
                        get_u64(row, 3)?,
                        get_u64(row, 4)?,
                        get_u64(row, 5)?,
                        get_u64(row, 6)?,
                    ))
                },
            )?;

            let mut hourly_sends = vec![0u64; buckets];
            let mut stmt = conn.prepare(
                "SELECT (CAST(strftime('%s', sent_at) AS INTEGER)
                         - CAST(strftime('%s', ?2) AS INTEGER)) / 3600 AS bucket,
                        COUNT(*)
                 FROM message_events
                 WHERE connection_id = ?1 AND sent_at >= ?2 AND sent_at < ?3
                 GROUP BY bucket",
            )?;
            let rows = stmt.query_map(params![id.0, from, to], |row| {
                Ok((row.get::<_, i64>(0)?, get_u64(row, 1)?))
            })?;
            for row in rows {
                let (bucket, count) = row?;
                let slot = usize::try_from(bucket).ok().and_then(|b| hourly_sends.get_mut(b));
                if let Some(slot) = slot {
                    *slot += count;
                }
            }

            let mut stmt = conn.prepare(
                "SELECT COUNT(*) FROM message_events
                 WHERE connection_id = ?1 AND sent_at >= ?2 AND sent_at < ?3
                   AND template IS NOT NULL
                 GROUP BY template",
            )?;
            let template_sends = stmt
                .query_map(params![id.0, from, to], |row| get_u64(row, 0))?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(MessageStats {
                sent,
                delivered,
                failed,
                read,
                user_signals: (signal_rows > 0).then_some(UserSignals { blocked, reported }),
                hourly_sends,
                template_sends,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;
    use waguard_core::{Connection, ThrottleSettings};

    use super::*;
    use crate::models::DeliveryStatus;
    use crate::queries::connections::insert_connection;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        insert_connection(
            &db,
            &Connection {
                id: ConnectionId(1),
                tenant_id: 1,
                phone_number: "+15550000001".into(),
                registered_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                is_active: true,
                throttle: ThrottleSettings::default(),
            },
        )
        .await
        .unwrap();
        (db, dir)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn aggregates_window() {
        let (db, _dir) = setup_db().await;
        let id = ConnectionId(1);
        let events = [
            (DeliveryStatus::Delivered, "promo", 0),
            (DeliveryStatus::Read, "promo", 10),
            (DeliveryStatus::Failed, "otp", 70),
            (DeliveryStatus::Sent, "otp", 130),
        ];
        for (status, template, minutes) in events {
            let event = MessageEvent::new(id, status, start() + Duration::minutes(minutes))
                .with_template(template);
            record_message_event(&db, &event).await.unwrap();
        }
        // outside the window
        let late = MessageEvent::new(id, DeliveryStatus::Delivered, start() + Duration::hours(24));
        record_message_event(&db, &late).await.unwrap();

        let stats = message_stats(&db, id, start(), start() + Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(stats.sent, 4);
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.read, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.user_signals, None);
        assert_eq!(stats.hourly_sends.len(), 24);
        assert_eq!(&stats.hourly_sends[..3], &[2, 1, 1]);
        let mut templates = stats.template_sends.clone();
        templates.sort_unstable();
        assert_eq!(templates, vec![2, 2]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn signals_present_only_when_reported() {
        let (db, _dir) = setup_db().await;
        let id = ConnectionId(1);
        record_message_event(
            &db,
            &MessageEvent::new(id, DeliveryStatus::Delivered, start()).with_signals(true, false),
        )
        .await
        .unwrap();
        record_message_event(&db, &MessageEvent::new(id, DeliveryStatus::Delivered, start()))
            .await
            .unwrap();

        let stats = message_stats(&db, id, start(), start() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(
            stats.user_signals,
            Some(UserSignals {
                blocked: 1,
                reported: 0
            })
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn empty_window_has_zero_buckets_filled() {
        let (db, _dir) = setup_db().await;
        let stats = message_stats(&db, ConnectionId(1), start(), start() + Duration::days(7))
            .await
            .unwrap();
        assert_eq!(stats.sent, 0);
        assert_eq!(stats.hourly_sends, vec![0; 168]);
        assert!(stats.template_sends.is_empty());
        db.close().await.unwrap();
    }
}
