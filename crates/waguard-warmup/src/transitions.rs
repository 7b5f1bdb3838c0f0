// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The warmup transition table.
//!
//! Every state change is looked up here by (from, to, trigger) and checked
//! against the actor roles allowed to drive it. Anything not listed is an
//! invalid transition.

use waguard_core::{ActorRole, ConnectionId, GovernorError, TriggerType, WarmupState};

use WarmupState::{Cooldown, New, Stable, Suspended, Warming};

/// One row of the table.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub from: &'static [WarmupState],
    pub trigger: TriggerType,
    pub to: WarmupState,
    pub actors: &'static [ActorRole],
}

impl TransitionRule {
    fn matches(&self, from: WarmupState, to: WarmupState, trigger: TriggerType) -> bool {
        self.to == to && self.trigger == trigger && self.from.contains(&from)
    }
}

const SYSTEM: &[ActorRole] = &[ActorRole::System];
const OWNER: &[ActorRole] = &[ActorRole::Owner];

pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        from: &[New],
        trigger: TriggerType::TimeElapsed,
        to: Warming,
        actors: SYSTEM,
    },
    TransitionRule {
        from: &[Warming],
        trigger: TriggerType::TimeElapsed,
        to: Stable,
        actors: SYSTEM,
    },
    TransitionRule {
        from: &[Warming, Stable],
        trigger: TriggerType::HealthDrop,
        to: Cooldown,
        actors: SYSTEM,
    },
    TransitionRule {
        from: &[New, Warming, Stable, Cooldown, Suspended],
        trigger: TriggerType::OwnerForce,
        to: Cooldown,
        actors: OWNER,
    },
    TransitionRule {
        from: &[Cooldown],
        trigger: TriggerType::HealthRecovery,
        to: Warming,
        actors: SYSTEM,
    },
    TransitionRule {
        from: &[Cooldown, Suspended],
        trigger: TriggerType::OwnerResume,
        to: Warming,
        actors: OWNER,
    },
    TransitionRule {
        from: &[Cooldown],
        trigger: TriggerType::HealthDrop,
        to: Suspended,
        actors: SYSTEM,
    },
];

/// Whether the table lists (from, to, trigger) for `role`.
pub fn is_allowed(
    from: WarmupState,
    to: WarmupState,
    trigger: TriggerType,
    role: ActorRole,
) -> bool {
    TRANSITIONS
        .iter()
        .any(|rule| rule.matches(from, to, trigger) && rule.actors.contains(&role))
}

/// Reject any transition the table does not allow.
pub fn guard(
    connection_id: ConnectionId,
    from: WarmupState,
    to: WarmupState,
    trigger: TriggerType,
    role: ActorRole,
) -> Result<(), GovernorError> {
    if is_allowed(from, to, trigger, role) {
        Ok(())
    } else {
        Err(GovernorError::InvalidTransition {
            connection_id,
            from,
            to,
            trigger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotions_are_system_only() {
        assert!(is_allowed(New, Warming, TriggerType::TimeElapsed, ActorRole::System));
        assert!(!is_allowed(New, Warming, TriggerType::TimeElapsed, ActorRole::Owner));
        assert!(!is_allowed(New, Stable, TriggerType::TimeElapsed, ActorRole::System));
    }

    #[test]
    fn owner_force_from_any_state() {
        for from in WarmupState::ALL {
            assert!(is_allowed(from, Cooldown, TriggerType::OwnerForce, ActorRole::Owner));
            assert!(!is_allowed(from, Cooldown, TriggerType::OwnerForce, ActorRole::Webhook));
        }
    }

    #[test]
    fn resume_only_from_throttled_states() {
        let allowed: Vec<WarmupState> = WarmupState::ALL
            .into_iter()
            .filter(|s| is_allowed(*s, Warming, TriggerType::OwnerResume, ActorRole::Owner))
            .collect();
        assert_eq!(allowed, vec![Cooldown, Suspended]);
    }

    #[test]
    fn guard_reports_the_rejected_edge() {
        let err = guard(
            ConnectionId(8),
            Stable,
            Warming,
            TriggerType::OwnerResume,
            ActorRole::Owner,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GovernorError::InvalidTransition {
                from: Stable,
                to: Warming,
                trigger: TriggerType::OwnerResume,
                ..
            }
        ));
    }

    #[test]
    fn suspension_never_expires_on_its_own() {
        for to in WarmupState::ALL {
            for trigger in [
                TriggerType::HealthRecovery,
                TriggerType::TimeElapsed,
                TriggerType::HealthDrop,
            ] {
                assert!(!is_allowed(Suspended, to, trigger, ActorRole::System));
            }
        }
    }
}
