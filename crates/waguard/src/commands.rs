// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot CLI commands that print JSON to stdout.

use std::str::FromStr;

use waguard_config::WaguardConfig;
use waguard_core::{ConnectionId, GovernorError, ScoreWindow};
use waguard_governor::{Governor, RecalcRequest};

use crate::serve::{close_store, init_tracing, open_governor};

pub async fn run_recalculate(
    config: WaguardConfig,
    connection_id: Option<i64>,
    window: Option<&str>,
) -> Result<(), GovernorError> {
    init_tracing(&config.service.log_level);
    let (governor, store) = open_governor(&config).await?;
    let output = recalculate_json(&governor, connection_id, window).await;
    drop(governor);
    close_store(store).await;
    println!("{}", output?);
    Ok(())
}

pub async fn run_summary(config: WaguardConfig) -> Result<(), GovernorError> {
    init_tracing(&config.service.log_level);
    let (governor, store) = open_governor(&config).await?;
    let output = summary_json(&governor).await;
    drop(governor);
    close_store(store).await;
    println!("{}", output?);
    Ok(())
}

async fn recalculate_json(
    governor: &Governor,
    connection_id: Option<i64>,
    window: Option<&str>,
) -> Result<String, GovernorError> {
    let window = match window {
        Some(raw) => ScoreWindow::from_str(raw).map_err(|_| GovernorError::InvalidRequest {
            message: format!("unknown window '{raw}', expected 24h, 7d or 30d"),
        })?,
        None => governor.default_window(),
    };
    let response = governor
        .execute(RecalcRequest {
            connection_id: connection_id.map(ConnectionId),
            window,
        })
        .await?;
    to_pretty(&response)
}

async fn summary_json(governor: &Governor) -> Result<String, GovernorError> {
    to_pretty(&governor.summary().await?)
}

fn to_pretty<T: serde::Serialize>(value: &T) -> Result<String, GovernorError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| GovernorError::Internal(format!("failed to serialize output: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use waguard_storage::{DeliveryStatus, MessageEvent};
    use waguard_test_utils::fixtures;

    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> WaguardConfig {
        let mut config = WaguardConfig::default();
        config.storage.database_path = dir.path().join("cli.db").to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn recalculate_and_summary_print_json() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let (governor, store) = open_governor(&config).await.unwrap();

        let now = Utc::now();
        store
            .insert_connection(&fixtures::connection(1, 60, now))
            .await
            .unwrap();
        for i in 0..20 {
            let at = now - Duration::minutes(i * 15 + 1);
            store
                .record_message_event(&MessageEvent::new(
                    ConnectionId(1),
                    DeliveryStatus::Delivered,
                    at,
                ))
                .await
                .unwrap();
        }

        let single = recalculate_json(&governor, Some(1), Some("24h")).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&single).unwrap();
        assert_eq!(value["connection_id"], 1);
        assert_eq!(value["window"], "24h");

        let batch = recalculate_json(&governor, None, None).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&batch).unwrap();
        assert_eq!(value["succeeded"], 1);

        let summary = summary_json(&governor).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&summary).unwrap();
        assert_eq!(value["total"], 1);

        drop(governor);
        close_store(store).await;
    }

    #[tokio::test]
    async fn unknown_window_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (governor, store) = open_governor(&config_in(&dir)).await.unwrap();

        let err = recalculate_json(&governor, Some(1), Some("1y")).await.unwrap_err();
        assert!(matches!(err, GovernorError::InvalidRequest { .. }));

        drop(governor);
        close_store(store).await;
    }
}
