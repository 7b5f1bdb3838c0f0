// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Governor errors as HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use waguard_core::{ErrorKind, GovernorError};

#[derive(Debug)]
pub struct ApiError(pub GovernorError);

impl From<GovernorError> for ApiError {
    fn from(err: GovernorError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ConnectionNotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientData | ErrorKind::InvalidRequest => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidTransition | ErrorKind::ScoreTooLow | ErrorKind::RecomputeInProgress => {
            StatusCode::CONFLICT
        }
        ErrorKind::TelemetryUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::LedgerWriteFailed
        | ErrorKind::Storage
        | ErrorKind::Config
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(error = %self.0, %kind, "admin request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                kind,
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use waguard_core::ConnectionId;

    use super::*;

    #[test]
    fn statuses_by_kind() {
        assert_eq!(status_for(ErrorKind::ConnectionNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::InsufficientData), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::ScoreTooLow), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::RecomputeInProgress), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::TelemetryUnavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorKind::LedgerWriteFailed), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn body_carries_kind_and_message() {
        let body = ErrorBody {
            error: ErrorDetail {
                kind: ErrorKind::ConnectionNotFound,
                message: GovernorError::ConnectionNotFound {
                    connection_id: ConnectionId(9),
                }
                .to_string(),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["kind"], "connection_not_found");
        assert_eq!(json["error"]["message"], "connection 9 not found");
    }
}
