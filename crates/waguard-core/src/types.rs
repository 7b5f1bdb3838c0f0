// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifiers and enumerations shared across the governor.
//!
//! Every enum has a stable `snake_case` string form used both in JSON
//! and in the persisted columns.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Identifier of a WhatsApp connection (one outbound number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub i64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rolling telemetry window a score is computed over.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
pub enum ScoreWindow {
    #[default]
    #[strum(serialize = "24h")]
    #[serde(rename = "24h")]
    Last24h,
    #[strum(serialize = "7d")]
    #[serde(rename = "7d")]
    Last7d,
    #[strum(serialize = "30d")]
    #[serde(rename = "30d")]
    Last30d,
}

impl ScoreWindow {
    /// Length of the window.
    pub fn duration(self) -> chrono::Duration {
        match self {
            Self::Last24h => chrono::Duration::hours(24),
            Self::Last7d => chrono::Duration::days(7),
            Self::Last30d => chrono::Duration::days(30),
        }
    }

    /// Number of hourly buckets the window spans.
    pub fn hours(self) -> usize {
        self.duration().num_hours() as usize
    }
}

/// Status grade derived from a health score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HealthGrade {
    Excellent,
    Good,
    Warning,
    Critical,
}

impl HealthGrade {
    /// All grades, best first.
    pub const ALL: [HealthGrade; 4] = [
        HealthGrade::Excellent,
        HealthGrade::Good,
        HealthGrade::Warning,
        HealthGrade::Critical,
    ];

    /// Ordinal where a larger value is a better grade.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Warning => 1,
            Self::Good => 2,
            Self::Excellent => 3,
        }
    }
}

/// Per-number warmup lifecycle state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WarmupState {
    /// Just registered; minimal privileges while trust accumulates.
    New,
    /// Limits rise with number age while health stays acceptable.
    Warming,
    /// Graduated; limits at the ceiling.
    Stable,
    /// Temporary throttling window with an expiry.
    Cooldown,
    /// Throttled until an owner resumes it.
    Suspended,
}

impl WarmupState {
    pub const ALL: [WarmupState; 5] = [
        WarmupState::New,
        WarmupState::Warming,
        WarmupState::Stable,
        WarmupState::Cooldown,
        WarmupState::Suspended,
    ];
}

/// What caused a warmup state transition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    HealthDrop,
    HealthRecovery,
    TimeElapsed,
    OwnerForce,
    OwnerResume,
}

/// Role of whoever initiated an operation. Used for audit and trigger guards only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Owner,
    System,
    Webhook,
}

/// Opaque actor identity attached to ledger rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    /// The governor itself (scheduler or recompute).
    pub fn system() -> Self {
        Self {
            id: "system".to_string(),
            role: ActorRole::System,
        }
    }

    /// A platform owner identified by an opaque id.
    pub fn owner(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: ActorRole::Owner,
        }
    }
}

/// Protective action the policy engine can apply, mildest first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    ReduceBatch,
    AddDelay,
    PauseCampaign,
    PauseWarmup,
    BlockReconnect,
}

impl PolicyAction {
    /// All actions ordered from mildest to most severe.
    pub const BY_SEVERITY: [PolicyAction; 5] = [
        PolicyAction::ReduceBatch,
        PolicyAction::AddDelay,
        PolicyAction::PauseCampaign,
        PolicyAction::PauseWarmup,
        PolicyAction::BlockReconnect,
    ];

    /// The auto-block an action opens while active, if it is a pause-type action.
    pub fn block_type(self) -> Option<BlockType> {
        match self {
            Self::PauseCampaign => Some(BlockType::CampaignPause),
            Self::PauseWarmup => Some(BlockType::WarmupPause),
            Self::BlockReconnect => Some(BlockType::ReconnectBlock),
            Self::ReduceBatch | Self::AddDelay => None,
        }
    }
}

/// Which limit a `WarmupLimitChange` row refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LimitType {
    Daily,
    Hourly,
    BatchSize,
    DelaySeconds,
}

/// Category of an auto-block.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    CampaignPause,
    WarmupPause,
    ReconnectBlock,
    Cooldown,
    Suspension,
}

/// Severity attached to an auto-block.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BlockSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BlockType {
    pub fn severity(self) -> BlockSeverity {
        match self {
            Self::CampaignPause => BlockSeverity::Medium,
            Self::WarmupPause | Self::Cooldown => BlockSeverity::High,
            Self::ReconnectBlock | Self::Suspension => BlockSeverity::Critical,
        }
    }
}

/// Who closed an auto-block.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    System,
    Owner,
    OwnerForce,
}

/// Direction of a score trend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Flat,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn window_round_trips_short_form() {
        for (window, text) in [
            (ScoreWindow::Last24h, "24h"),
            (ScoreWindow::Last7d, "7d"),
            (ScoreWindow::Last30d, "30d"),
        ] {
            assert_eq!(window.to_string(), text);
            assert_eq!(ScoreWindow::from_str(text).unwrap(), window);
        }
        assert!(ScoreWindow::from_str("1y").is_err());
        assert_eq!(ScoreWindow::Last7d.hours(), 168);
    }

    #[test]
    fn window_serde_uses_short_form() {
        let json = serde_json::to_string(&ScoreWindow::Last30d).unwrap();
        assert_eq!(json, "\"30d\"");
        let parsed: ScoreWindow = serde_json::from_str("\"7d\"").unwrap();
        assert_eq!(parsed, ScoreWindow::Last7d);
    }

    #[test]
    fn grade_rank_orders_best_highest() {
        let ranks: Vec<u8> = HealthGrade::ALL.iter().map(|g| g.rank()).collect();
        assert_eq!(ranks, vec![3, 2, 1, 0]);
    }

    #[test]
    fn state_strings_are_snake_case() {
        assert_eq!(WarmupState::Cooldown.to_string(), "cooldown");
        assert_eq!(
            WarmupState::from_str("suspended").unwrap(),
            WarmupState::Suspended
        );
        assert_eq!(TriggerType::OwnerForce.as_ref(), "owner_force");
    }

    #[test]
    fn actions_are_ordered_by_severity() {
        let mut sorted = PolicyAction::BY_SEVERITY;
        sorted.sort();
        assert_eq!(sorted, PolicyAction::BY_SEVERITY);
        assert!(PolicyAction::BlockReconnect > PolicyAction::ReduceBatch);
        assert_eq!(
            PolicyAction::BlockReconnect.block_type(),
            Some(BlockType::ReconnectBlock)
        );
        assert_eq!(PolicyAction::AddDelay.block_type(), None);
    }

    #[test]
    fn actor_constructors() {
        assert_eq!(Actor::system().role, ActorRole::System);
        let owner = Actor::owner("owner-9");
        assert_eq!(owner.id, "owner-9");
        assert_eq!(owner.role, ActorRole::Owner);
    }
}
