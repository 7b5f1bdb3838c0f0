// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Action policy engine.
//!
//! Maps a score and warmup state onto the five protective actions. Each
//! action has its own threshold; an inactive action applies at
//! `score <= threshold`, an active one clears only above
//! `threshold + hysteresis_margin`. Severity is cumulative, and the
//! reconnect block never clears on score alone.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use waguard_config::model::PolicyConfig;
use waguard_core::{ActionFlags, PolicyAction, ThrottleSettings, WarmupState};

/// One action flipping on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionChange {
    pub action: PolicyAction,
    pub applied: bool,
}

/// Target flags plus the changes relative to the input flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    pub flags: ActionFlags,
    pub changes: Vec<ActionChange>,
}

impl PolicyDecision {
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ActionPolicy {
    config: PolicyConfig,
}

impl ActionPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Score at or below which `action` applies.
    pub fn threshold(&self, action: PolicyAction) -> f64 {
        match action {
            PolicyAction::ReduceBatch => self.config.reduce_batch_score,
            PolicyAction::AddDelay => self.config.add_delay_score,
            PolicyAction::PauseCampaign => self.config.pause_campaign_score,
            PolicyAction::PauseWarmup => self.config.pause_warmup_score,
            PolicyAction::BlockReconnect => self.config.block_reconnect_score,
        }
    }

    /// Compute target flags for `score` given the currently applied flags.
    pub fn evaluate(&self, score: f64, state: WarmupState, current: ActionFlags) -> PolicyDecision {
        let mut target = ActionFlags::default();

        for action in PolicyAction::BY_SEVERITY {
            let threshold = self.threshold(action);
            let active = if current.get(action) {
                action == PolicyAction::BlockReconnect
                    || score <= threshold + self.config.hysteresis_margin
            } else {
                score <= threshold
            };
            target.set(action, active);
        }

        if state == WarmupState::Suspended {
            target.set(PolicyAction::PauseWarmup, true);
        }

        // Walk from most to least severe; once anything is active, every milder action is too.
        let mut escalated = false;
        for action in PolicyAction::BY_SEVERITY.iter().rev() {
            escalated |= target.get(*action);
            if escalated && !target.get(*action) {
                debug!(%action, score, "milder action held on by a more severe one");
                target.set(*action, true);
            }
        }

        PolicyDecision {
            flags: target,
            changes: diff(current, target),
        }
    }

    /// Throttle fields the send pipeline reads for a set of active flags.
    ///
    /// An already-running reconnect block keeps its original expiry.
    pub fn throttle_for(
        &self,
        flags: ActionFlags,
        previous: &ThrottleSettings,
        now: DateTime<Utc>,
    ) -> ThrottleSettings {
        let reconnect_blocked_until = if !flags.reconnect_blocked {
            None
        } else if previous.reconnect_blocked {
            previous
                .reconnect_blocked_until
                .or_else(|| Some(now + Duration::hours(self.config.reconnect_block_hours)))
        } else {
            Some(now + Duration::hours(self.config.reconnect_block_hours))
        };

        ThrottleSettings {
            batch_size_override: flags
                .batch_size_reduced
                .then_some(self.config.reduced_batch_size),
            delay_override_secs: flags.delay_added.then_some(self.config.added_delay_secs),
            campaigns_paused: flags.campaign_paused,
            warmup_paused: flags.warmup_paused,
            reconnect_blocked: flags.reconnect_blocked,
            reconnect_blocked_until,
        }
    }
}

/// Changes from `from` to `to`, mildest action first.
pub fn diff(from: ActionFlags, to: ActionFlags) -> Vec<ActionChange> {
    PolicyAction::BY_SEVERITY
        .iter()
        .filter(|a| from.get(**a) != to.get(**a))
        .map(|&action| ActionChange {
            action,
            applied: to.get(action),
        })
        .collect()
}
