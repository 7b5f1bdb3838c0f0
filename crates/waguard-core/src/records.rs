// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model records: connections, scores, warmup state, and ledger rows.
//!
//! Ledger records carry `id: None` until the store assigns one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    ActorRole, BlockSeverity, BlockType, ConnectionId, HealthGrade, LimitType, PolicyAction,
    ResolvedBy, ScoreWindow, TriggerType, WarmupState,
};

/// Throttling fields on a connection that the external send pipeline reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrottleSettings {
    pub batch_size_override: Option<u32>,
    pub delay_override_secs: Option<u32>,
    pub campaigns_paused: bool,
    pub warmup_paused: bool,
    pub reconnect_blocked: bool,
    pub reconnect_blocked_until: Option<DateTime<Utc>>,
}

/// A WhatsApp number tied to a tenant. Owned by an external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub tenant_id: i64,
    pub phone_number: String,
    pub registered_at: DateTime<Utc>,
    pub is_active: bool,
    pub throttle: ThrottleSettings,
}

impl Connection {
    /// Whole days since the number was registered.
    pub fn age_days(&self, now: DateTime<Utc>) -> u32 {
        (now - self.registered_at).num_days().max(0) as u32
    }
}

/// Opt-out style signals from recipients, when the telemetry store has them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSignals {
    pub blocked: u64,
    pub reported: u64,
}

/// Aggregated message counts for one connection over one window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStats {
    pub sent: u64,
    pub delivered: u64,
    pub failed: u64,
    pub read: u64,
    pub user_signals: Option<UserSignals>,
    /// Messages sent per hour across the window, oldest first.
    pub hourly_sends: Vec<u64>,
    /// Messages sent per template (order irrelevant).
    pub template_sends: Vec<u64>,
}

/// Currently applied protective actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFlags {
    pub batch_size_reduced: bool,
    pub delay_added: bool,
    pub campaign_paused: bool,
    pub warmup_paused: bool,
    pub reconnect_blocked: bool,
}

impl ActionFlags {
    pub fn get(&self, action: PolicyAction) -> bool {
        match action {
            PolicyAction::ReduceBatch => self.batch_size_reduced,
            PolicyAction::AddDelay => self.delay_added,
            PolicyAction::PauseCampaign => self.campaign_paused,
            PolicyAction::PauseWarmup => self.warmup_paused,
            PolicyAction::BlockReconnect => self.reconnect_blocked,
        }
    }

    pub fn set(&mut self, action: PolicyAction, active: bool) {
        match action {
            PolicyAction::ReduceBatch => self.batch_size_reduced = active,
            PolicyAction::AddDelay => self.delay_added = active,
            PolicyAction::PauseCampaign => self.campaign_paused = active,
            PolicyAction::PauseWarmup => self.warmup_paused = active,
            PolicyAction::BlockReconnect => self.reconnect_blocked = active,
        }
    }

    /// Whether any action is applied.
    pub fn any(&self) -> bool {
        PolicyAction::BY_SEVERITY.iter().any(|a| self.get(*a))
    }

    /// Active actions, mildest first.
    pub fn active(&self) -> Vec<PolicyAction> {
        PolicyAction::BY_SEVERITY
            .iter()
            .copied()
            .filter(|a| self.get(*a))
            .collect()
    }
}

/// The five weighted components of a health score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub delivery: f64,
    pub failure: f64,
    pub user_signal: f64,
    pub pattern: f64,
    pub template_mix: f64,
}

/// Current health record for a connection; overwritten on every recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub connection_id: ConnectionId,
    pub score: f64,
    pub status: HealthGrade,
    pub delivery_rate: f64,
    pub failure_rate: f64,
    pub sub_scores: SubScores,
    pub flags: ActionFlags,
    pub window: ScoreWindow,
    pub messages_sent: u64,
    pub calculated_at: DateTime<Utc>,
}

/// One append-only score sample used for trend analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthHistoryPoint {
    pub connection_id: ConnectionId,
    pub score: f64,
    pub status: HealthGrade,
    pub window: ScoreWindow,
    pub recorded_at: DateTime<Utc>,
}

/// Daily/hourly send ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub daily: u32,
    pub hourly: u32,
}

/// Per-connection warmup record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warmup {
    pub connection_id: ConnectionId,
    pub state: WarmupState,
    pub current_daily_limit: u32,
    pub current_hourly_limit: u32,
    pub sent_today: u32,
    pub force_cooldown: bool,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub number_age_days: u32,
    pub last_health_score: Option<f64>,
    pub last_health_status: Option<HealthGrade>,
    pub state_changed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Warmup {
    pub fn limits(&self) -> Limits {
        Limits {
            daily: self.current_daily_limit,
            hourly: self.current_hourly_limit,
        }
    }
}

/// Immutable record of one warmup state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmupStateEvent {
    pub id: Option<i64>,
    pub connection_id: ConnectionId,
    pub from_state: WarmupState,
    pub to_state: WarmupState,
    pub trigger_type: TriggerType,
    pub health_score_at_event: Option<f64>,
    pub actor_id: String,
    pub actor_role: ActorRole,
    pub reason: Option<String>,
    /// Set only when an owner bypassed the score gate.
    pub is_override: bool,
    pub created_at: DateTime<Utc>,
}

/// Immutable record of one limit change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmupLimitChange {
    pub id: Option<i64>,
    pub connection_id: ConnectionId,
    pub limit_type: LimitType,
    pub old_value: u32,
    pub new_value: u32,
    pub reason: String,
    pub warmup_state_at_change: WarmupState,
    pub created_at: DateTime<Utc>,
}

/// An auto-block. Opened once, resolved at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmupAutoBlock {
    pub id: Option<i64>,
    pub connection_id: ConnectionId,
    pub block_type: BlockType,
    pub severity: BlockSeverity,
    pub trigger_event: String,
    pub blocked_at: DateTime<Utc>,
    pub blocked_until: Option<DateTime<Utc>>,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by_type: Option<ResolvedBy>,
    pub messages_blocked: u64,
}

impl WarmupAutoBlock {
    /// A fresh, unresolved block.
    pub fn open(
        connection_id: ConnectionId,
        block_type: BlockType,
        trigger_event: impl Into<String>,
        blocked_at: DateTime<Utc>,
        blocked_until: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: None,
            connection_id,
            block_type,
            severity: block_type.severity(),
            trigger_event: trigger_event.into(),
            blocked_at,
            blocked_until,
            is_resolved: false,
            resolved_at: None,
            resolved_by_type: None,
            messages_blocked: 0,
        }
    }
}

/// Closes every open block of `block_type` for the changeset's connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockResolution {
    pub block_type: BlockType,
    pub resolved_at: DateTime<Utc>,
    pub resolved_by: ResolvedBy,
}

/// One auto-block mutation. Applied in order, so a block can be resolved
/// and reopened (or opened then superseded) within one changeset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockChange {
    Open(WarmupAutoBlock),
    Resolve(BlockResolution),
}

impl BlockChange {
    pub fn block_type(&self) -> BlockType {
        match self {
            Self::Open(block) => block.block_type,
            Self::Resolve(resolution) => resolution.block_type,
        }
    }
}

/// Everything the store knows about a connection before an operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub health: Option<HealthScore>,
    pub warmup: Option<Warmup>,
    pub open_blocks: Vec<WarmupAutoBlock>,
}

impl Snapshot {
    pub fn has_open_block(&self, block_type: BlockType) -> bool {
        self.open_blocks.iter().any(|b| b.block_type == block_type)
    }
}

/// The complete write set of one governor operation, committed atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct Changeset {
    pub connection_id: ConnectionId,
    pub health: Option<HealthScore>,
    pub history: Option<HealthHistoryPoint>,
    pub warmup: Option<Warmup>,
    pub throttle: Option<ThrottleSettings>,
    pub state_events: Vec<WarmupStateEvent>,
    pub limit_changes: Vec<WarmupLimitChange>,
    pub blocks: Vec<BlockChange>,
}

impl Changeset {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            health: None,
            history: None,
            warmup: None,
            throttle: None,
            state_events: Vec::new(),
            limit_changes: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Number of ledger rows (events, limit changes, blocks) this changeset appends or resolves.
    pub fn ledger_rows(&self) -> usize {
        self.state_events.len() + self.limit_changes.len() + self.blocks.len()
    }
}

/// Pagination request for ledger reads. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub const MAX_PER_PAGE: u32 = 200;

    /// Builds a page, clamping to sane bounds.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, 50)
    }
}

/// One page of ledger rows, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn flags_get_set_round_trip() {
        let mut flags = ActionFlags::default();
        assert!(!flags.any());
        flags.set(PolicyAction::PauseCampaign, true);
        assert!(flags.campaign_paused);
        assert!(flags.get(PolicyAction::PauseCampaign));
        assert_eq!(flags.active(), vec![PolicyAction::PauseCampaign]);
        flags.set(PolicyAction::PauseCampaign, false);
        assert!(!flags.any());
    }

    #[test]
    fn connection_age_never_negative() {
        let registered = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        let conn = Connection {
            id: ConnectionId(1),
            tenant_id: 1,
            phone_number: "+15550000001".into(),
            registered_at: registered,
            is_active: true,
            throttle: ThrottleSettings::default(),
        };
        let later = Utc.with_ymd_and_hms(2026, 3, 20, 12, 0, 0).unwrap();
        assert_eq!(conn.age_days(later), 10);
        let earlier = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(conn.age_days(earlier), 0);
    }

    #[test]
    fn page_clamps_and_offsets() {
        let page = Page::new(0, 10_000);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, Page::MAX_PER_PAGE);
        assert_eq!(Page::new(3, 20).offset(), 40);
    }

    #[test]
    fn open_block_takes_type_severity() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        let block = WarmupAutoBlock::open(
            ConnectionId(2),
            BlockType::ReconnectBlock,
            "health_score_drop",
            now,
            None,
        );
        assert_eq!(block.severity, BlockSeverity::Critical);
        assert!(!block.is_resolved);
        assert_eq!(block.messages_blocked, 0);
    }

    #[test]
    fn changeset_counts_ledger_rows() {
        let mut cs = Changeset::new(ConnectionId(4));
        assert_eq!(cs.ledger_rows(), 0);
        cs.blocks.push(BlockChange::Resolve(BlockResolution {
            block_type: BlockType::Cooldown,
            resolved_at: Utc::now(),
            resolved_by: ResolvedBy::System,
        }));
        assert_eq!(cs.ledger_rows(), 1);
        assert_eq!(cs.blocks[0].block_type(), BlockType::Cooldown);
    }
}
