// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for the waguard governor.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::types::{ConnectionId, ScoreWindow, TriggerType, WarmupState};

/// The primary error type returned by every governor operation and collaborator trait.
#[derive(Debug, Error)]
pub enum GovernorError {
    /// Unknown connection id. Nothing was mutated.
    #[error("connection {connection_id} not found")]
    ConnectionNotFound { connection_id: ConnectionId },

    /// Zero messages were sent in the requested window. Prior score and state are kept.
    #[error("connection {connection_id} sent no messages in the {window} window")]
    InsufficientData {
        connection_id: ConnectionId,
        window: ScoreWindow,
    },

    /// Telemetry read failed or timed out. Retryable on the next tick.
    #[error("telemetry unavailable for connection {connection_id}: {message}")]
    TelemetryUnavailable {
        connection_id: ConnectionId,
        message: String,
    },

    /// The requested transition is not in the warmup transition table.
    #[error("invalid transition {from} -> {to} ({trigger}) for connection {connection_id}")]
    InvalidTransition {
        connection_id: ConnectionId,
        from: WarmupState,
        to: WarmupState,
        trigger: TriggerType,
    },

    /// Score gate rejected an owner action.
    #[error("score {score:.2} for connection {connection_id} is below the required {required:.2}")]
    ScoreTooLow {
        connection_id: ConnectionId,
        score: f64,
        required: f64,
    },

    /// The atomic commit of state plus ledger rows failed; nothing was applied.
    #[error("ledger write failed for connection {connection_id}: {source}")]
    LedgerWriteFailed {
        connection_id: ConnectionId,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Caller supplied an argument outside its allowed range.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Another operation holds the connection's lock past the wait budget.
    #[error("a recompute is already in progress for connection {connection_id}")]
    RecomputeInProgress { connection_id: ConnectionId },

    /// Storage read errors (writes surface as `LedgerWriteFailed`).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors detected at runtime.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Machine-readable error kind exposed to administrative callers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConnectionNotFound,
    InsufficientData,
    TelemetryUnavailable,
    InvalidTransition,
    ScoreTooLow,
    LedgerWriteFailed,
    InvalidRequest,
    RecomputeInProgress,
    Storage,
    Config,
    Internal,
}

impl GovernorError {
    /// Returns the machine-readable kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionNotFound { .. } => ErrorKind::ConnectionNotFound,
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::TelemetryUnavailable { .. } => ErrorKind::TelemetryUnavailable,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::ScoreTooLow { .. } => ErrorKind::ScoreTooLow,
            Self::LedgerWriteFailed { .. } => ErrorKind::LedgerWriteFailed,
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::RecomputeInProgress { .. } => ErrorKind::RecomputeInProgress,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Config(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The connection this error is attributed to, if any.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        match self {
            Self::ConnectionNotFound { connection_id }
            | Self::InsufficientData { connection_id, .. }
            | Self::TelemetryUnavailable { connection_id, .. }
            | Self::InvalidTransition { connection_id, .. }
            | Self::ScoreTooLow { connection_id, .. }
            | Self::LedgerWriteFailed { connection_id, .. }
            | Self::RecomputeInProgress { connection_id } => Some(*connection_id),
            _ => None,
        }
    }

    /// Whether the batch scheduler may retry this error on its next tick.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TelemetryUnavailable { .. } | Self::RecomputeInProgress { .. }
        )
    }

    /// Wrap a storage read error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let id = ConnectionId(7);
        assert_eq!(
            GovernorError::ConnectionNotFound { connection_id: id }.kind(),
            ErrorKind::ConnectionNotFound
        );
        assert_eq!(
            GovernorError::InsufficientData {
                connection_id: id,
                window: ScoreWindow::Last24h,
            }
            .kind(),
            ErrorKind::InsufficientData
        );
        assert_eq!(
            GovernorError::ScoreTooLow {
                connection_id: id,
                score: 55.0,
                required: 70.0,
            }
            .kind(),
            ErrorKind::ScoreTooLow
        );
        assert_eq!(
            GovernorError::Internal("x".into()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(ErrorKind::ScoreTooLow.to_string(), "score_too_low");
        let json = serde_json::to_string(&ErrorKind::LedgerWriteFailed).unwrap();
        assert_eq!(json, "\"ledger_write_failed\"");
    }

    #[test]
    fn messages_name_the_connection() {
        let err = GovernorError::InvalidTransition {
            connection_id: ConnectionId(3),
            from: WarmupState::Stable,
            to: WarmupState::Warming,
            trigger: TriggerType::OwnerResume,
        };
        let msg = err.to_string();
        assert!(msg.contains("stable -> warming"), "got: {msg}");
        assert!(msg.contains("connection 3"));
        assert_eq!(err.connection_id(), Some(ConnectionId(3)));
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        let id = ConnectionId(1);
        assert!(
            GovernorError::TelemetryUnavailable {
                connection_id: id,
                message: "timeout".into(),
            }
            .is_retryable()
        );
        assert!(!GovernorError::ConnectionNotFound { connection_id: id }.is_retryable());
    }
}
