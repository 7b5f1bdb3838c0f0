// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The warmup state machine.
//!
//! [`WarmupMachine::evaluate`] runs the automatic transitions for one
//! recompute until nothing else fires. Owner operations
//! ([`force_cooldown`](WarmupMachine::force_cooldown),
//! [`resume`](WarmupMachine::resume)) enter the table directly with the
//! owner's role. Every path returns a [`MachineOutcome`] carrying the new
//! record and the events, limit changes, and block changes that explain it.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use waguard_config::model::WarmupConfig;
use waguard_core::{
    ActionFlags, Actor, ActorRole, BlockChange, BlockResolution, BlockType, ConnectionId,
    GovernorError, HealthGrade, LimitType, Limits, ResolvedBy, TriggerType, Warmup,
    WarmupAutoBlock, WarmupLimitChange, WarmupState, WarmupStateEvent,
};

use crate::limits::LimitSchedule;
use crate::transitions::guard;

/// What one recompute observed about the number.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub score: f64,
    pub status: HealthGrade,
    pub age_days: u32,
    /// Health-drop cooldowns already recorded inside the relapse window.
    pub recent_relapses: u32,
    /// Actions the policy leaves active after this recompute.
    ///
    /// While `warmup_paused` is set no age promotion fires and WARMING
    /// limits are held where they are.
    pub actions: ActionFlags,
    pub now: DateTime<Utc>,
}

/// New warmup record plus the ledger rows describing how it got there.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineOutcome {
    pub warmup: Warmup,
    pub events: Vec<WarmupStateEvent>,
    pub limit_changes: Vec<WarmupLimitChange>,
    pub blocks: Vec<BlockChange>,
}

impl MachineOutcome {
    pub fn transitioned(&self) -> bool {
        !self.events.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct WarmupMachine {
    config: WarmupConfig,
    schedule: LimitSchedule,
    /// Score at or below which an active number drops into cooldown.
    health_drop_score: f64,
    /// Score required to leave cooldown or to be resumed by an owner.
    good_score: f64,
}

struct Step {
    to: WarmupState,
    trigger: TriggerType,
}

impl WarmupMachine {
    pub fn new(config: WarmupConfig, health_drop_score: f64, good_score: f64) -> Self {
        Self {
            schedule: LimitSchedule::new(config.clone()),
            config,
            health_drop_score,
            good_score,
        }
    }

    pub fn schedule(&self) -> &LimitSchedule {
        &self.schedule
    }

    pub fn good_score(&self) -> f64 {
        self.good_score
    }

    /// Window in which health-drop cooldowns count towards escalation.
    pub fn relapse_window(&self) -> Duration {
        Duration::days(self.config.relapse_window_days)
    }

    /// Record for a connection seen for the first time.
    pub fn initial(
        &self,
        connection_id: ConnectionId,
        age_days: u32,
        now: DateTime<Utc>,
    ) -> Warmup {
        let limits = self.schedule.initial();
        Warmup {
            connection_id,
            state: WarmupState::New,
            current_daily_limit: limits.daily,
            current_hourly_limit: limits.hourly,
            sent_today: 0,
            force_cooldown: false,
            cooldown_until: None,
            number_age_days: age_days,
            last_health_score: None,
            last_health_status: None,
            state_changed_at: now,
            updated_at: now,
        }
    }

    /// Apply every automatic transition the observation allows, until a fixed point.
    pub fn evaluate(&self, current: &Warmup, obs: Observation) -> MachineOutcome {
        let mut out = MachineOutcome {
            warmup: current.clone(),
            events: Vec::new(),
            limit_changes: Vec::new(),
            blocks: Vec::new(),
        };
        let before = current.limits();
        let mut relapses = obs.recent_relapses;

        out.warmup.number_age_days = obs.age_days;
        out.warmup.last_health_score = Some(obs.score);
        out.warmup.last_health_status = Some(obs.status);
        out.warmup.updated_at = obs.now;

        // Each state can be entered at most once per pass, so this bounds the loop.
        for _ in 0..WarmupState::ALL.len() {
            let Some(step) = self.next_step(&out.warmup, &obs, relapses) else {
                break;
            };
            let from = out.warmup.state;
            if guard(
                current.connection_id,
                from,
                step.to,
                step.trigger,
                ActorRole::System,
            )
            .is_err()
            {
                break;
            }

            self.enter(
                &mut out,
                from,
                step.to,
                step.trigger,
                obs.now,
                ResolvedBy::System,
            );
            if step.to == WarmupState::Cooldown {
                relapses += 1;
            }
            out.events.push(event(
                &out.warmup,
                from,
                step.trigger,
                Some(obs.score),
                &Actor::system(),
                None,
                false,
                obs.now,
            ));
            debug!(
                connection_id = %current.connection_id,
                from = %from,
                to = %step.to,
                trigger = %step.trigger,
                score = obs.score,
                "warmup transition"
            );
        }

        let growth_score = (!obs.actions.warmup_paused).then_some(obs.score);
        let target = self.schedule.limits_for(
            out.warmup.state,
            self.curve_age(&out.warmup, &obs, relapses),
            growth_score,
            before,
        );
        let reason = match out.events.last() {
            Some(e) => format!("{}: {} -> {}", e.trigger_type, e.from_state, e.to_state),
            None => "age_curve".to_string(),
        };
        self.apply_limits(&mut out, before, target, &reason, obs.now);
        out
    }

    /// Age the WARMING curve and graduation are measured against.
    ///
    /// A number with a health-drop cooldown inside the relapse window starts
    /// the curve again from the day it re-entered WARMING.
    fn curve_age(&self, warmup: &Warmup, obs: &Observation, relapses: u32) -> u32 {
        if relapses == 0 {
            return obs.age_days;
        }
        let rewarmed = (obs.now - warmup.state_changed_at).num_days().max(0);
        obs.age_days.min(u32::try_from(rewarmed).unwrap_or(u32::MAX))
    }

    fn next_step(&self, warmup: &Warmup, obs: &Observation, relapses: u32) -> Option<Step> {
        let c = &self.config;
        let dropped = obs.score <= self.health_drop_score;
        let promotable = obs.score >= c.promotion_min_score && !obs.actions.warmup_paused;
        let step = |to, trigger| Some(Step { to, trigger });

        match warmup.state {
            WarmupState::New if obs.age_days >= c.warming_after_days && promotable => {
                step(WarmupState::Warming, TriggerType::TimeElapsed)
            }
            WarmupState::Warming | WarmupState::Stable if dropped => {
                step(WarmupState::Cooldown, TriggerType::HealthDrop)
            }
            WarmupState::Warming
                if promotable
                    && self.curve_age(warmup, obs, relapses) >= c.stable_after_days =>
            {
                step(WarmupState::Stable, TriggerType::TimeElapsed)
            }
            WarmupState::Cooldown if dropped && relapses >= c.relapse_limit => {
                step(WarmupState::Suspended, TriggerType::HealthDrop)
            }
            WarmupState::Cooldown
                if warmup.cooldown_until.is_none_or(|until| obs.now >= until)
                    && obs.score >= self.good_score =>
            {
                step(WarmupState::Warming, TriggerType::HealthRecovery)
            }
            _ => None,
        }
    }

    /// Owner-forced cooldown from any state.
    pub fn force_cooldown(
        &self,
        current: &Warmup,
        actor: &Actor,
        hours: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<MachineOutcome, GovernorError> {
        let (min, max) = (
            self.config.force_cooldown_min_hours,
            self.config.force_cooldown_max_hours,
        );
        if !(min..=max).contains(&hours) {
            return Err(GovernorError::InvalidRequest {
                message: format!("cooldown hours must be within {min}..={max}, got {hours}"),
            });
        }
        let from = current.state;
        guard(
            current.connection_id,
            from,
            WarmupState::Cooldown,
            TriggerType::OwnerForce,
            actor.role,
        )?;

        let mut out = MachineOutcome {
            warmup: current.clone(),
            events: Vec::new(),
            limit_changes: Vec::new(),
            blocks: Vec::new(),
        };
        let until = now + Duration::hours(hours);
        out.warmup.force_cooldown = true;
        out.warmup.cooldown_until = Some(until);
        out.warmup.updated_at = now;

        // Extending an existing cooldown closes its block and opens a fresh one.
        self.enter(
            &mut out,
            from,
            WarmupState::Cooldown,
            TriggerType::OwnerForce,
            now,
            ResolvedBy::Owner,
        );

        out.events.push(event(
            &out.warmup,
            from,
            TriggerType::OwnerForce,
            current.last_health_score,
            actor,
            Some(reason.to_string()),
            false,
            now,
        ));

        let target = self.schedule.limits_for(
            WarmupState::Cooldown,
            current.number_age_days,
            current.last_health_score,
            current.limits(),
        );
        let limit_reason = format!("owner_force: {from} -> cooldown ({hours}h)");
        self.apply_limits(&mut out, current.limits(), target, &limit_reason, now);
        Ok(out)
    }

    /// Owner resume from COOLDOWN or SUSPENDED back to WARMING.
    ///
    /// `override_reason` is the audited force path: it bypasses the score
    /// gate and marks the event `is_override`.
    pub fn resume(
        &self,
        current: &Warmup,
        actor: &Actor,
        score: Option<f64>,
        override_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<MachineOutcome, GovernorError> {
        let from = current.state;
        guard(
            current.connection_id,
            from,
            WarmupState::Warming,
            TriggerType::OwnerResume,
            actor.role,
        )?;

        let is_override = override_reason.is_some();
        if !is_override {
            let passes = score.is_some_and(|s| s >= self.good_score);
            if !passes {
                return Err(GovernorError::ScoreTooLow {
                    connection_id: current.connection_id,
                    score: score.unwrap_or(0.0),
                    required: self.good_score,
                });
            }
        }

        let mut out = MachineOutcome {
            warmup: current.clone(),
            events: Vec::new(),
            limit_changes: Vec::new(),
            blocks: Vec::new(),
        };
        out.warmup.updated_at = now;
        let resolved_by = if is_override {
            ResolvedBy::OwnerForce
        } else {
            ResolvedBy::Owner
        };
        self.enter(
            &mut out,
            from,
            WarmupState::Warming,
            TriggerType::OwnerResume,
            now,
            resolved_by,
        );

        out.events.push(event(
            &out.warmup,
            from,
            TriggerType::OwnerResume,
            score,
            actor,
            override_reason.map(str::to_string),
            is_override,
            now,
        ));

        let target = self.schedule.limits_for(
            WarmupState::Warming,
            current.number_age_days,
            score,
            current.limits(),
        );
        let limit_reason = format!("owner_resume: {from} -> warming");
        self.apply_limits(&mut out, current.limits(), target, &limit_reason, now);
        Ok(out)
    }

    /// Move `out.warmup` into `to`, maintaining the cooldown fields and state blocks.
    ///
    /// Owner-forced cooldowns arrive with `cooldown_until` already set.
    fn enter(
        &self,
        out: &mut MachineOutcome,
        from: WarmupState,
        to: WarmupState,
        trigger: TriggerType,
        now: DateTime<Utc>,
        resolved_by: ResolvedBy,
    ) {
        let connection_id = out.warmup.connection_id;
        if let Some(block_type) = state_block(from) {
            out.blocks.push(resolve(block_type, now, resolved_by));
        }

        match to {
            WarmupState::Cooldown => {
                if trigger != TriggerType::OwnerForce {
                    out.warmup.force_cooldown = false;
                    out.warmup.cooldown_until =
                        Some(now + Duration::hours(self.config.auto_cooldown_hours));
                }
            }
            WarmupState::Suspended
            | WarmupState::New
            | WarmupState::Warming
            | WarmupState::Stable => {
                out.warmup.force_cooldown = false;
                out.warmup.cooldown_until = None;
            }
        }

        if let Some(block_type) = state_block(to) {
            let blocked_until = match to {
                WarmupState::Cooldown => out.warmup.cooldown_until,
                _ => None,
            };
            out.blocks.push(BlockChange::Open(WarmupAutoBlock::open(
                connection_id,
                block_type,
                trigger.as_ref(),
                now,
                blocked_until,
            )));
        }

        out.warmup.state = to;
        out.warmup.state_changed_at = now;
    }

    fn apply_limits(
        &self,
        out: &mut MachineOutcome,
        before: Limits,
        target: Limits,
        reason: &str,
        now: DateTime<Utc>,
    ) {
        let state = out.warmup.state;
        let connection_id = out.warmup.connection_id;
        for (limit_type, old, new) in [
            (LimitType::Daily, before.daily, target.daily),
            (LimitType::Hourly, before.hourly, target.hourly),
        ] {
            if old != new {
                out.limit_changes.push(WarmupLimitChange {
                    id: None,
                    connection_id,
                    limit_type,
                    old_value: old,
                    new_value: new,
                    reason: reason.to_string(),
                    warmup_state_at_change: state,
                    created_at: now,
                });
            }
        }
        out.warmup.current_daily_limit = target.daily;
        out.warmup.current_hourly_limit = target.hourly;
    }
}

/// The auto-block a throttled state keeps open while it lasts.
fn state_block(state: WarmupState) -> Option<BlockType> {
    match state {
        WarmupState::Cooldown => Some(BlockType::Cooldown),
        WarmupState::Suspended => Some(BlockType::Suspension),
        WarmupState::New | WarmupState::Warming | WarmupState::Stable => None,
    }
}

fn resolve(block_type: BlockType, now: DateTime<Utc>, resolved_by: ResolvedBy) -> BlockChange {
    BlockChange::Resolve(BlockResolution {
        block_type,
        resolved_at: now,
        resolved_by,
    })
}

#[allow(clippy::too_many_arguments)]
fn event(
    after: &Warmup,
    from: WarmupState,
    trigger: TriggerType,
    score: Option<f64>,
    actor: &Actor,
    reason: Option<String>,
    is_override: bool,
    now: DateTime<Utc>,
) -> WarmupStateEvent {
    WarmupStateEvent {
        id: None,
        connection_id: after.connection_id,
        from_state: from,
        to_state: after.state,
        trigger_type: trigger,
        health_score_at_event: score,
        actor_id: actor.id.clone(),
        actor_role: actor.role,
        reason,
        is_override,
        created_at: now,
    }
}
