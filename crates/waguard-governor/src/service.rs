// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Governor service: recompute and owner operations.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use waguard_config::WaguardConfig;
use waguard_core::{
    ActionFlags, Actor, ActorRole, Changeset, Clock, Connection, ConnectionId, ConnectionStore,
    GovernorError, GovernorStore, HealthHistoryPoint, HealthScore, MessageStats, ResolvedBy,
    ScoreWindow, Snapshot, TelemetrySource, Warmup, WarmupState,
};
use waguard_health::policy::diff;
use waguard_health::{ActionPolicy, HealthCalculator, TrendAnalyzer};
use waguard_warmup::{MachineOutcome, Observation, WarmupMachine};

use crate::effects::{self, Cause};
use crate::locks::ConnectionLocks;
use crate::metrics;

/// The external stores and clock a governor runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub telemetry: Arc<dyn TelemetrySource>,
    pub connections: Arc<dyn ConnectionStore>,
    pub store: Arc<dyn GovernorStore>,
    pub clock: Arc<dyn Clock>,
}

pub struct Governor {
    pub(crate) calculator: HealthCalculator,
    pub(crate) policy: ActionPolicy,
    pub(crate) machine: WarmupMachine,
    pub(crate) trends: TrendAnalyzer,
    pub(crate) telemetry: Arc<dyn TelemetrySource>,
    pub(crate) connections: Arc<dyn ConnectionStore>,
    pub(crate) store: Arc<dyn GovernorStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) locks: ConnectionLocks,
    pub(crate) telemetry_timeout: Duration,
    pub(crate) max_concurrency: usize,
    pub(crate) default_window: ScoreWindow,
}

impl Governor {
    /// Build a governor from validated configuration.
    pub fn new(config: &WaguardConfig, deps: Collaborators) -> Self {
        let calculator = HealthCalculator::new(config.scoring.clone());
        let machine = WarmupMachine::new(
            config.warmup.clone(),
            config.policy.pause_warmup_score,
            calculator.good_threshold(),
        );
        Self {
            policy: ActionPolicy::new(config.policy.clone()),
            trends: TrendAnalyzer::new(config.trend.clone()),
            calculator,
            machine,
            telemetry: deps.telemetry,
            connections: deps.connections,
            store: deps.store,
            clock: deps.clock,
            locks: ConnectionLocks::new(Duration::from_secs(config.scheduler.lock_wait_secs)),
            telemetry_timeout: Duration::from_secs(config.scheduler.telemetry_timeout_secs),
            max_concurrency: config.scheduler.max_concurrency.max(1),
            default_window: config.scheduler.window,
        }
    }

    /// Override how long an operation waits for a busy connection.
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.locks.set_wait(wait);
        self
    }

    /// Override the telemetry read budget.
    pub fn with_telemetry_timeout(mut self, timeout: Duration) -> Self {
        self.telemetry_timeout = timeout;
        self
    }

    pub fn default_window(&self) -> ScoreWindow {
        self.default_window
    }

    pub fn good_threshold(&self) -> f64 {
        self.calculator.good_threshold()
    }

    /// Connections with an operation running or waiting right now.
    pub fn busy_connections(&self) -> usize {
        self.locks.len()
    }

    pub(crate) async fn connection(&self, id: ConnectionId) -> Result<Connection, GovernorError> {
        self.connections
            .get_connection(id)
            .await?
            .ok_or(GovernorError::ConnectionNotFound { connection_id: id })
    }

    fn current_warmup(
        &self,
        snapshot: &Snapshot,
        connection: &Connection,
        now: DateTime<Utc>,
    ) -> Warmup {
        snapshot.warmup.clone().unwrap_or_else(|| {
            self.machine
                .initial(connection.id, connection.age_days(now), now)
        })
    }

    async fn read_stats(
        &self,
        id: ConnectionId,
        window: ScoreWindow,
        now: DateTime<Utc>,
    ) -> Result<MessageStats, GovernorError> {
        let start = now - window.duration();
        let read = self.telemetry.message_stats(id, start, now);
        match tokio::time::timeout(self.telemetry_timeout, read).await {
            Ok(Ok(stats)) => Ok(stats),
            Ok(Err(e @ GovernorError::TelemetryUnavailable { .. })) => Err(e),
            Ok(Err(e)) => Err(GovernorError::TelemetryUnavailable {
                connection_id: id,
                message: e.to_string(),
            }),
            Err(_) => Err(GovernorError::TelemetryUnavailable {
                connection_id: id,
                message: format!(
                    "telemetry read timed out after {}ms",
                    self.telemetry_timeout.as_millis()
                ),
            }),
        }
    }

    /// Commit a changeset and record what it did.
    async fn commit(&self, changeset: Changeset) -> Result<(), GovernorError> {
        let id = changeset.connection_id;
        let rows = changeset.ledger_rows();
        let transitions: Vec<_> = changeset
            .state_events
            .iter()
            .map(|e| (e.from_state, e.to_state, e.trigger_type, e.actor_id.clone()))
            .collect();

        self.store.commit(changeset).await?;

        metrics::record_ledger_rows(rows);
        for (from, to, trigger, actor_id) in transitions {
            metrics::record_transition(from, to, trigger);
            info!(
                connection_id = %id,
                %from,
                %to,
                %trigger,
                actor_id = %actor_id,
                "warmup transition"
            );
        }
        Ok(())
    }

    /// Score a connection over `window`, then apply policy and warmup transitions.
    ///
    /// Nothing is written when the connection is unknown, telemetry is
    /// unavailable, or the window holds no messages.
    pub async fn recalculate(
        &self,
        id: ConnectionId,
        window: ScoreWindow,
    ) -> Result<HealthScore, GovernorError> {
        let started = Instant::now();
        let result = self.recalculate_locked(id, window).await;
        let outcome = match &result {
            Ok(_) => "ok".to_string(),
            Err(e) => e.kind().to_string(),
        };
        metrics::record_recompute(&outcome, started.elapsed().as_secs_f64());
        result
    }

    async fn recalculate_locked(
        &self,
        id: ConnectionId,
        window: ScoreWindow,
    ) -> Result<HealthScore, GovernorError> {
        let _guard = self.locks.acquire(id).await?;
        let connection = self.connection(id).await?;
        let now = self.clock.now();

        let stats = self.read_stats(id, window, now).await?;
        let card = self.calculator.calculate(id, window, &stats).inspect_err(|e| {
            debug!(connection_id = %id, %window, error = %e, "recompute skipped");
        })?;
        metrics::record_score(card.score);

        let snapshot = self.store.load_snapshot(id).await?;
        let age_days = connection.age_days(now);
        let current = self.current_warmup(&snapshot, &connection, now);
        let since = now - self.machine.relapse_window();
        let recent_relapses = self
            .store
            .count_health_drop_cooldowns_since(id, since)
            .await?;

        let previous_flags = snapshot
            .health
            .as_ref()
            .map(|h| h.flags)
            .unwrap_or_default();
        // The machine sees the actions this score leaves in force, so a
        // paused warmup cannot promote in the same pass.
        let prospective = self
            .policy
            .evaluate(card.score, current.state, previous_flags)
            .flags;

        let outcome = self.machine.evaluate(
            &current,
            Observation {
                score: card.score,
                status: card.status,
                age_days,
                recent_relapses,
                actions: prospective,
                now,
            },
        );

        let decision = self
            .policy
            .evaluate(card.score, outcome.warmup.state, previous_flags);
        let throttle = self
            .policy
            .throttle_for(decision.flags, &connection.throttle, now);

        let detail = format!("score {:.2}", card.score);
        let policy_effects = effects::for_changes(
            id,
            &snapshot,
            &decision.changes,
            &connection.throttle,
            &throttle,
            outcome.warmup.state,
            &Cause {
                trigger_event: "health_score_drop",
                detail: &detail,
                resolved_by: ResolvedBy::System,
            },
            now,
        );

        let health = HealthScore {
            connection_id: id,
            score: card.score,
            status: card.status,
            delivery_rate: card.delivery_rate,
            failure_rate: card.failure_rate,
            sub_scores: card.sub_scores,
            flags: decision.flags,
            window,
            messages_sent: card.messages_sent,
            calculated_at: now,
        };

        let mut cs = Changeset::new(id);
        cs.health = Some(health.clone());
        cs.history = Some(HealthHistoryPoint {
            connection_id: id,
            score: card.score,
            status: card.status,
            window,
            recorded_at: now,
        });
        cs.throttle = (throttle != connection.throttle).then_some(throttle);
        absorb(&mut cs, outcome);
        cs.limit_changes.extend(policy_effects.limit_changes);
        cs.blocks.extend(policy_effects.blocks);

        for change in &decision.changes {
            info!(
                connection_id = %id,
                action = %change.action,
                applied = change.applied,
                score = card.score,
                "policy action changed"
            );
        }
        self.commit(cs).await?;
        debug!(connection_id = %id, score = health.score, status = %health.status, "recomputed");
        Ok(health)
    }

    /// Owner-forced cooldown for `hours`, from any state.
    pub async fn force_cooldown(
        &self,
        id: ConnectionId,
        actor: &Actor,
        hours: i64,
        reason: &str,
    ) -> Result<Warmup, GovernorError> {
        let _guard = self.locks.acquire(id).await?;
        let connection = self.connection(id).await?;
        let now = self.clock.now();
        let snapshot = self.store.load_snapshot(id).await?;
        let current = self.current_warmup(&snapshot, &connection, now);

        let outcome = self
            .machine
            .force_cooldown(&current, actor, hours, reason, now)?;
        let warmup = outcome.warmup.clone();
        let mut cs = Changeset::new(id);
        absorb(&mut cs, outcome);
        self.commit(cs).await?;

        metrics::record_owner_action("force_cooldown");
        info!(connection_id = %id, actor_id = %actor.id, hours, reason, "cooldown forced");
        Ok(warmup)
    }

    /// Owner resume from COOLDOWN or SUSPENDED; requires a good score.
    pub async fn resume(&self, id: ConnectionId, actor: &Actor) -> Result<Warmup, GovernorError> {
        let warmup = self.resume_inner(id, actor, None).await?;
        metrics::record_owner_action("resume");
        info!(connection_id = %id, actor_id = %actor.id, "connection resumed");
        Ok(warmup)
    }

    /// Resume bypassing the score gate. Recorded with `is_override`.
    pub async fn force_resume(
        &self,
        id: ConnectionId,
        actor: &Actor,
        reason: &str,
    ) -> Result<Warmup, GovernorError> {
        let warmup = self.resume_inner(id, actor, Some(reason)).await?;
        metrics::record_owner_action("force_resume");
        warn!(
            connection_id = %id,
            actor_id = %actor.id,
            reason,
            "connection force-resumed below the score gate"
        );
        Ok(warmup)
    }

    async fn resume_inner(
        &self,
        id: ConnectionId,
        actor: &Actor,
        override_reason: Option<&str>,
    ) -> Result<Warmup, GovernorError> {
        let _guard = self.locks.acquire(id).await?;
        let connection = self.connection(id).await?;
        let now = self.clock.now();
        let snapshot = self.store.load_snapshot(id).await?;
        let current = self.current_warmup(&snapshot, &connection, now);
        let score = snapshot
            .health
            .as_ref()
            .map(|h| h.score)
            .or(current.last_health_score);

        let outcome = self
            .machine
            .resume(&current, actor, score, override_reason, now)?;

        // Resume also lifts the reconnect block; other actions stay with the score.
        let before = snapshot
            .health
            .as_ref()
            .map(|h| h.flags)
            .unwrap_or_default();
        let after = ActionFlags {
            reconnect_blocked: false,
            ..before
        };
        let (detail, resolved_by) = match override_reason {
            Some(reason) => (format!("force_resume: {reason}"), ResolvedBy::OwnerForce),
            None => ("owner_resume".to_string(), ResolvedBy::Owner),
        };
        let warmup = outcome.warmup.clone();
        let cs = self.flag_changeset(
            &snapshot,
            &connection,
            before,
            after,
            warmup.state,
            Cause {
                trigger_event: "owner_resume",
                detail: &detail,
                resolved_by,
            },
            Some(outcome),
            now,
        );
        self.commit(cs).await?;
        Ok(warmup)
    }

    /// Clear every action flag. Requires a good score.
    pub async fn reset_actions(
        &self,
        id: ConnectionId,
        actor: &Actor,
    ) -> Result<ActionFlags, GovernorError> {
        let flags = self.reset_inner(id, actor, None).await?;
        metrics::record_owner_action("reset_actions");
        info!(connection_id = %id, actor_id = %actor.id, "actions reset");
        Ok(flags)
    }

    /// Clear every action flag regardless of score.
    ///
    /// The next recompute reapplies whatever the score still warrants.
    pub async fn force_reset_actions(
        &self,
        id: ConnectionId,
        actor: &Actor,
        reason: &str,
    ) -> Result<ActionFlags, GovernorError> {
        let flags = self.reset_inner(id, actor, Some(reason)).await?;
        metrics::record_owner_action("force_reset_actions");
        warn!(
            connection_id = %id,
            actor_id = %actor.id,
            reason,
            "actions force-reset; they may reapply on the next recompute"
        );
        Ok(flags)
    }

    async fn reset_inner(
        &self,
        id: ConnectionId,
        actor: &Actor,
        force_reason: Option<&str>,
    ) -> Result<ActionFlags, GovernorError> {
        if actor.role != ActorRole::Owner {
            return Err(GovernorError::InvalidRequest {
                message: format!("resetting actions requires an owner actor, got {}", actor.role),
            });
        }
        let _guard = self.locks.acquire(id).await?;
        let connection = self.connection(id).await?;
        let now = self.clock.now();
        let snapshot = self.store.load_snapshot(id).await?;

        if force_reason.is_none() {
            let good = self.calculator.good_threshold();
            let score = snapshot.health.as_ref().map(|h| h.score);
            if !score.is_some_and(|s| s >= good) {
                return Err(GovernorError::ScoreTooLow {
                    connection_id: id,
                    score: score.unwrap_or(0.0),
                    required: good,
                });
            }
        }

        let before = snapshot
            .health
            .as_ref()
            .map(|h| h.flags)
            .unwrap_or_default();
        let after = ActionFlags::default();
        let state = snapshot
            .warmup
            .as_ref()
            .map(|w| w.state)
            .unwrap_or(WarmupState::New);
        let (detail, resolved_by) = match force_reason {
            Some(reason) => (format!("force_reset_actions: {reason}"), ResolvedBy::OwnerForce),
            None => ("reset_actions".to_string(), ResolvedBy::Owner),
        };
        let cs = self.flag_changeset(
            &snapshot,
            &connection,
            before,
            after,
            state,
            Cause {
                trigger_event: "reset_actions",
                detail: &detail,
                resolved_by,
            },
            None,
            now,
        );
        self.commit(cs).await?;
        Ok(after)
    }

    /// Changeset for an owner-driven flag change, optionally with a machine outcome.
    #[allow(clippy::too_many_arguments)]
    fn flag_changeset(
        &self,
        snapshot: &Snapshot,
        connection: &Connection,
        before: ActionFlags,
        after: ActionFlags,
        state: WarmupState,
        cause: Cause<'_>,
        outcome: Option<MachineOutcome>,
        now: DateTime<Utc>,
    ) -> Changeset {
        let id = connection.id;
        let throttle = self.policy.throttle_for(after, &connection.throttle, now);
        let changes = diff(before, after);
        let flag_effects = effects::for_changes(
            id,
            snapshot,
            &changes,
            &connection.throttle,
            &throttle,
            state,
            &cause,
            now,
        );

        let mut cs = Changeset::new(id);
        if before != after {
            cs.health = snapshot.health.clone().map(|mut h| {
                h.flags = after;
                h
            });
        }
        cs.throttle = (throttle != connection.throttle).then_some(throttle);
        if let Some(outcome) = outcome {
            absorb(&mut cs, outcome);
        }
        cs.limit_changes.extend(flag_effects.limit_changes);
        cs.blocks.extend(flag_effects.blocks);
        cs
    }
}

/// Move a machine outcome's record and ledger rows into a changeset.
fn absorb(cs: &mut Changeset, outcome: MachineOutcome) {
    cs.warmup = Some(outcome.warmup);
    cs.state_events.extend(outcome.events);
    cs.limit_changes.extend(outcome.limit_changes);
    cs.blocks.extend(outcome.blocks);
}
