// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handlers for `/v1/health` and the public endpoints.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use waguard_core::{
    ActionFlags, ConnectionId, GovernorError, Page, Paged, ScoreWindow, Warmup, WarmupAutoBlock,
    WarmupLimitChange, WarmupStateEvent,
};
use waguard_governor::{ConnectionDetail, HealthSummary, RecalcRequest, RecalcResponse};
use waguard_health::Trend;

use crate::auth::OwnerActor;
use crate::error::ApiError;
use crate::server::GatewayState;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Body for `POST /v1/health/recalculate`.
#[derive(Debug, Default, Deserialize)]
pub struct RecalculateBody {
    /// `None` recomputes every active connection.
    #[serde(default)]
    pub connection_id: Option<i64>,
    /// `24h`, `7d` or `30d`. Defaults to the scheduler window.
    #[serde(default)]
    pub window: Option<String>,
    /// Hand the request to the background queue instead of waiting.
    #[serde(default)]
    pub queued: bool,
}

#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
    pub connection_id: Option<ConnectionId>,
    pub window: ScoreWindow,
}

#[derive(Debug, Deserialize)]
pub struct ForceCooldownBody {
    pub hours: i64,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReasonBody {
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct FlagsResponse {
    pub connection_id: ConnectionId,
    pub flags: ActionFlags,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    fn page(&self) -> Page {
        let default = Page::default();
        Page::new(
            self.page.unwrap_or(default.page),
            self.per_page.unwrap_or(default.per_page),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

fn parse_window(raw: Option<&str>, default: ScoreWindow) -> Result<ScoreWindow, GovernorError> {
    match raw {
        None => Ok(default),
        Some(s) => ScoreWindow::from_str(s).map_err(|_| GovernorError::InvalidRequest {
            message: format!("unknown window '{s}', expected 24h, 7d or 30d"),
        }),
    }
}

fn require_reason(reason: &str) -> Result<&str, GovernorError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(GovernorError::InvalidRequest {
            message: "a reason is required for override actions".to_string(),
        });
    }
    Ok(reason)
}

/// GET /v1/health/summary
pub async fn get_summary(State(state): State<GatewayState>) -> ApiResult<HealthSummary> {
    Ok(Json(state.governor.summary().await?))
}

/// GET /v1/health/connections/{id}
pub async fn get_connection(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<ConnectionDetail> {
    Ok(Json(state.governor.connection_detail(ConnectionId(id)).await?))
}

/// GET /v1/health/connections/{id}/trend?days=N
pub async fn get_trend(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Query(query): Query<TrendQuery>,
) -> ApiResult<Trend> {
    Ok(Json(state.governor.trend(ConnectionId(id), query.days).await?))
}

/// POST /v1/health/recalculate
///
/// Runs inline unless `queued` is set, in which case it answers 202 and the
/// queue worker does the work.
pub async fn post_recalculate(
    State(state): State<GatewayState>,
    body: Option<Json<RecalculateBody>>,
) -> Result<Response, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let window = parse_window(body.window.as_deref(), state.governor.default_window())?;
    let request = RecalcRequest {
        connection_id: body.connection_id.map(ConnectionId),
        window,
    };

    if body.queued {
        let queue = state.queue.as_ref().ok_or_else(|| GovernorError::InvalidRequest {
            message: "queued recalculation is not enabled".to_string(),
        })?;
        queue.submit(request)?;
        let accepted = QueuedResponse {
            queued: true,
            connection_id: request.connection_id,
            window,
        };
        return Ok((StatusCode::ACCEPTED, Json(accepted)).into_response());
    }

    let response: RecalcResponse = state.governor.execute(request).await?;
    Ok(Json(response).into_response())
}

/// POST /v1/health/connections/{id}/force-cooldown
pub async fn post_force_cooldown(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    OwnerActor(actor): OwnerActor,
    Json(body): Json<ForceCooldownBody>,
) -> ApiResult<Warmup> {
    let reason = require_reason(&body.reason)?;
    let warmup = state
        .governor
        .force_cooldown(ConnectionId(id), &actor, body.hours, reason)
        .await?;
    Ok(Json(warmup))
}

/// POST /v1/health/connections/{id}/resume
pub async fn post_resume(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    OwnerActor(actor): OwnerActor,
) -> ApiResult<Warmup> {
    Ok(Json(state.governor.resume(ConnectionId(id), &actor).await?))
}

/// POST /v1/health/connections/{id}/force-resume
pub async fn post_force_resume(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    OwnerActor(actor): OwnerActor,
    Json(body): Json<ReasonBody>,
) -> ApiResult<Warmup> {
    let reason = require_reason(&body.reason)?;
    let warmup = state
        .governor
        .force_resume(ConnectionId(id), &actor, reason)
        .await?;
    Ok(Json(warmup))
}

/// POST /v1/health/connections/{id}/reset-actions
pub async fn post_reset_actions(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    OwnerActor(actor): OwnerActor,
) -> ApiResult<FlagsResponse> {
    let connection_id = ConnectionId(id);
    let flags = state.governor.reset_actions(connection_id, &actor).await?;
    Ok(Json(FlagsResponse {
        connection_id,
        flags,
    }))
}

/// POST /v1/health/connections/{id}/force-reset-actions
pub async fn post_force_reset_actions(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    OwnerActor(actor): OwnerActor,
    Json(body): Json<ReasonBody>,
) -> ApiResult<FlagsResponse> {
    let reason = require_reason(&body.reason)?;
    let connection_id = ConnectionId(id);
    let flags = state
        .governor
        .force_reset_actions(connection_id, &actor, reason)
        .await?;
    Ok(Json(FlagsResponse {
        connection_id,
        flags,
    }))
}

/// GET /v1/health/connections/{id}/history/states
pub async fn get_state_history(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Paged<WarmupStateEvent>> {
    Ok(Json(
        state
            .governor
            .state_history(ConnectionId(id), query.page())
            .await?,
    ))
}

/// GET /v1/health/connections/{id}/history/limits
pub async fn get_limit_history(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Paged<WarmupLimitChange>> {
    Ok(Json(
        state
            .governor
            .limit_history(ConnectionId(id), query.page())
            .await?,
    ))
}

/// GET /v1/health/connections/{id}/history/blocks
pub async fn get_block_history(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Paged<WarmupAutoBlock>> {
    Ok(Json(
        state
            .governor
            .block_history(ConnectionId(id), query.page())
            .await?,
    ))
}

/// GET /healthz
pub async fn get_liveness(State(state): State<GatewayState>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recalculate_body_defaults() {
        let body: RecalculateBody = serde_json::from_str("{}").unwrap();
        assert!(body.connection_id.is_none());
        assert!(body.window.is_none());
        assert!(!body.queued);

        let raw = r#"{"connection_id": 4, "window": "7d", "queued": true}"#;
        let body: RecalculateBody = serde_json::from_str(raw).unwrap();
        assert_eq!(body.connection_id, Some(4));
        assert!(body.queued);
    }

    #[test]
    fn windows_parse_or_reject() {
        assert_eq!(
            parse_window(Some("30d"), ScoreWindow::Last24h).unwrap(),
            ScoreWindow::Last30d
        );
        assert_eq!(
            parse_window(None, ScoreWindow::Last7d).unwrap(),
            ScoreWindow::Last7d
        );
        assert!(matches!(
            parse_window(Some("1y"), ScoreWindow::Last24h),
            Err(GovernorError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn page_query_clamps() {
        let q = PageQuery {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(q.page(), Page::new(1, Page::MAX_PER_PAGE));
        assert_eq!(PageQuery::default().page(), Page::default());
    }

    #[test]
    fn blank_reasons_are_rejected() {
        assert!(require_reason("   ").is_err());
        assert_eq!(require_reason(" manual ").unwrap(), "manual");
    }
}
