// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the waguard number governor.
//!
//! Holds the domain records, the error taxonomy, and the collaborator
//! traits (telemetry, connections, governor store, clock) every other
//! crate in the workspace is written against.

pub mod error;
pub mod records;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, GovernorError};
pub use records::{
    ActionFlags, BlockChange, BlockResolution, Changeset, Connection, HealthHistoryPoint,
    HealthScore, Limits, MessageStats, Page, Paged, Snapshot, SubScores, ThrottleSettings,
    UserSignals, Warmup, WarmupAutoBlock, WarmupLimitChange, WarmupStateEvent,
};
pub use traits::{Clock, ConnectionStore, GovernorStore, SystemClock, TelemetrySource};
pub use types::{
    Actor, ActorRole, BlockSeverity, BlockType, ConnectionId, HealthGrade, LimitType,
    PolicyAction, ResolvedBy, ScoreWindow, TrendDirection, TriggerType, WarmupState,
};
