// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for scoring and policy invariants.

use proptest::prelude::*;
use waguard_config::model::{PolicyConfig, ScoringConfig};
use waguard_core::{
    ActionFlags, ConnectionId, MessageStats, PolicyAction, ScoreWindow, UserSignals, WarmupState,
};
use waguard_health::{ActionPolicy, HealthCalculator};

fn arb_stats() -> impl Strategy<Value = MessageStats> {
    (
        1u64..100_000,
        0.0f64..=1.0,
        0.0f64..=1.0,
        proptest::option::of((0u64..500, 0u64..500)),
        proptest::collection::vec(0u64..1_000, 0..48),
        proptest::collection::vec(0u64..1_000, 0..12),
    )
        .prop_map(|(sent, d, f, signals, hourly, templates)| {
            let delivered = (sent as f64 * d) as u64;
            let failed = ((sent - delivered) as f64 * f) as u64;
            MessageStats {
                sent,
                delivered,
                failed,
                read: delivered / 2,
                user_signals: signals.map(|(blocked, reported)| UserSignals { blocked, reported }),
                hourly_sends: hourly,
                template_sends: templates,
            }
        })
}

fn arb_state() -> impl Strategy<Value = WarmupState> {
    proptest::sample::select(WarmupState::ALL.to_vec())
}

fn arb_flags() -> impl Strategy<Value = ActionFlags> {
    proptest::collection::vec(any::<bool>(), 5).prop_map(|bits| {
        let mut flags = ActionFlags::default();
        for (action, on) in PolicyAction::BY_SEVERITY.iter().zip(bits) {
            flags.set(*action, on);
        }
        flags
    })
}

proptest! {
    #[test]
    fn score_and_sub_scores_are_bounded(stats in arb_stats()) {
        let calc = HealthCalculator::new(ScoringConfig::default());
        let card = calc.calculate(ConnectionId(1), ScoreWindow::Last24h, &stats).unwrap();
        prop_assert!((0.0..=100.0).contains(&card.score));
        for sub in [
            card.sub_scores.delivery,
            card.sub_scores.failure,
            card.sub_scores.user_signal,
            card.sub_scores.pattern,
            card.sub_scores.template_mix,
        ] {
            prop_assert!((0.0..=100.0).contains(&sub));
        }
        prop_assert_eq!(card.status, calc.grade(card.score));
    }

    #[test]
    fn status_is_monotonic(a in 0.0f64..=100.0, b in 0.0f64..=100.0) {
        let calc = HealthCalculator::new(ScoringConfig::default());
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(calc.grade(hi).rank() >= calc.grade(lo).rank());
    }

    #[test]
    fn severity_is_cumulative(score in 0.0f64..=100.0, state in arb_state(), flags in arb_flags()) {
        let policy = ActionPolicy::new(PolicyConfig::default());
        let decision = policy.evaluate(score, state, flags);
        let active: Vec<bool> = PolicyAction::BY_SEVERITY
            .iter()
            .map(|a| decision.flags.get(*a))
            .collect();
        // once an action is off, nothing more severe may be on
        for pair in active.windows(2) {
            prop_assert!(pair[0] || !pair[1], "flags {:?}", decision.flags);
        }
    }

    #[test]
    fn policy_is_idempotent(score in 0.0f64..=100.0, state in arb_state(), flags in arb_flags()) {
        let policy = ActionPolicy::new(PolicyConfig::default());
        let first = policy.evaluate(score, state, flags);
        let second = policy.evaluate(score, state, first.flags);
        prop_assert!(second.is_unchanged());
        prop_assert_eq!(second.flags, first.flags);
    }
}
