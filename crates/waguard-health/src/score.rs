// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health score calculator.
//!
//! Turns a window of [`MessageStats`] into five bounded sub-scores and a
//! weighted total. Band edges, weights, and grade cut points all come from
//! [`ScoringConfig`].

use tracing::debug;
use waguard_config::model::{BandEdges, ScoringConfig};
use waguard_core::{
    ConnectionId, GovernorError, HealthGrade, MessageStats, ScoreWindow, SubScores,
};

/// Result of scoring one telemetry window.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub score: f64,
    pub status: HealthGrade,
    pub delivery_rate: f64,
    pub failure_rate: f64,
    pub sub_scores: SubScores,
    pub messages_sent: u64,
}

/// Weighted five-signal health score.
#[derive(Debug, Clone)]
pub struct HealthCalculator {
    config: ScoringConfig,
}

impl HealthCalculator {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score at or above which a number counts as "good".
    pub fn good_threshold(&self) -> f64 {
        self.config.grades.good
    }

    /// Status grade for a score. Monotonic: a higher score never yields a worse grade.
    pub fn grade(&self, score: f64) -> HealthGrade {
        let grades = &self.config.grades;
        if score >= grades.excellent {
            HealthGrade::Excellent
        } else if score >= grades.good {
            HealthGrade::Good
        } else if score >= grades.warning {
            HealthGrade::Warning
        } else {
            HealthGrade::Critical
        }
    }

    /// Score a telemetry window.
    ///
    /// Fails with [`GovernorError::InsufficientData`] when nothing was sent.
    pub fn calculate(
        &self,
        connection_id: ConnectionId,
        window: ScoreWindow,
        stats: &MessageStats,
    ) -> Result<ScoreCard, GovernorError> {
        if stats.sent == 0 {
            return Err(GovernorError::InsufficientData {
                connection_id,
                window,
            });
        }

        let sent = stats.sent as f64;
        let delivery_rate = percent(stats.delivered as f64, sent);
        let failure_rate = percent(stats.failed as f64, sent);

        let sub_scores = SubScores {
            delivery: higher_is_better(delivery_rate, &self.config.delivery),
            failure: lower_is_better(failure_rate, &self.config.failure),
            user_signal: self.user_signal_score(stats),
            pattern: self.pattern_score(&stats.hourly_sends),
            template_mix: self.template_mix_score(&stats.template_sends),
        };

        let w = &self.config.weights;
        let weighted = w.delivery * sub_scores.delivery
            + w.failure * sub_scores.failure
            + w.user_signal * sub_scores.user_signal
            + w.pattern * sub_scores.pattern
            + w.template_mix * sub_scores.template_mix;
        let score = round2(weighted.clamp(0.0, 100.0));
        debug!(
            %connection_id,
            %window,
            delivery = sub_scores.delivery,
            failure = sub_scores.failure,
            user_signal = sub_scores.user_signal,
            pattern = sub_scores.pattern,
            template_mix = sub_scores.template_mix,
            score,
            "scored window"
        );

        Ok(ScoreCard {
            score,
            status: self.grade(score),
            delivery_rate: round2(delivery_rate),
            failure_rate: round2(failure_rate),
            sub_scores: SubScores {
                delivery: round2(sub_scores.delivery),
                failure: round2(sub_scores.failure),
                user_signal: round2(sub_scores.user_signal),
                pattern: round2(sub_scores.pattern),
                template_mix: round2(sub_scores.template_mix),
            },
            messages_sent: stats.sent,
        })
    }

    fn user_signal_score(&self, stats: &MessageStats) -> f64 {
        match stats.user_signals {
            Some(signals) => {
                let rate = percent((signals.blocked + signals.reported) as f64, stats.sent as f64);
                lower_is_better(rate, &self.config.user_signal)
            }
            None => 100.0,
        }
    }

    /// Penalizes bursty cadence using the coefficient of variation of hourly sends.
    fn pattern_score(&self, hourly_sends: &[u64]) -> f64 {
        if hourly_sends.len() < 2 {
            return 100.0;
        }
        let n = hourly_sends.len() as f64;
        let mean = hourly_sends.iter().sum::<u64>() as f64 / n;
        if mean <= 0.0 {
            return 100.0;
        }
        let variance = hourly_sends
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        let cv = variance.sqrt() / mean;

        let cfg = &self.config.pattern;
        if cv <= cfg.smooth_cv {
            100.0
        } else if cv >= cfg.bursty_cv {
            0.0
        } else {
            100.0 * (cfg.bursty_cv - cv) / (cfg.bursty_cv - cfg.smooth_cv)
        }
    }

    /// Penalizes concentration of traffic on one template.
    fn template_mix_score(&self, template_sends: &[u64]) -> f64 {
        let total: u64 = template_sends.iter().sum();
        let Some(&top) = template_sends.iter().max() else {
            return 100.0;
        };
        if total == 0 {
            return 100.0;
        }
        let share = top as f64 / total as f64;

        let cfg = &self.config.template_mix;
        if share <= cfg.max_healthy_share {
            100.0
        } else {
            let over = (share - cfg.max_healthy_share) / (1.0 - cfg.max_healthy_share);
            100.0 - over * (100.0 - cfg.floor_score)
        }
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    (part * 100.0 / whole).clamp(0.0, 100.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Linear interpolation of `x` from `[x0, x1]` onto `[y0, y1]`.
fn lerp(x: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    if (x1 - x0).abs() < f64::EPSILON {
        return y1;
    }
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// Bands for a rate where larger is healthier (edges descend).
fn higher_is_better(rate: f64, b: &BandEdges) -> f64 {
    let s = if rate >= b.excellent {
        lerp(rate, b.excellent, 100.0, 90.0, 100.0)
    } else if rate >= b.good {
        lerp(rate, b.good, b.excellent, 70.0, 90.0)
    } else if rate >= b.warning {
        lerp(rate, b.warning, b.good, 40.0, 70.0)
    } else if rate >= b.floor {
        lerp(rate, b.floor, b.warning, 0.0, 40.0)
    } else {
        0.0
    };
    s.clamp(0.0, 100.0)
}

/// Bands for a rate where smaller is healthier (edges ascend).
fn lower_is_better(rate: f64, b: &BandEdges) -> f64 {
    let s = if rate <= b.excellent {
        lerp(rate, 0.0, b.excellent, 100.0, 90.0)
    } else if rate <= b.good {
        lerp(rate, b.excellent, b.good, 90.0, 70.0)
    } else if rate <= b.warning {
        lerp(rate, b.good, b.warning, 70.0, 40.0)
    } else if rate <= b.floor {
        lerp(rate, b.warning, b.floor, 40.0, 0.0)
    } else {
        0.0
    };
    s.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use waguard_core::UserSignals;

    use super::*;

    fn calc() -> HealthCalculator {
        HealthCalculator::new(ScoringConfig::default())
    }

    fn stats(sent: u64, delivered: u64, failed: u64) -> MessageStats {
        MessageStats {
            sent,
            delivered,
            failed,
            ..Default::default()
        }
    }

    #[test]
    fn clean_window_is_excellent() {
        let card = calc()
            .calculate(ConnectionId(1), ScoreWindow::Last24h, &stats(100, 98, 0))
            .unwrap();
        assert_eq!(card.sub_scores.delivery, 96.0);
        assert_eq!(card.sub_scores.failure, 100.0);
        assert_eq!(card.score, 98.4);
        assert_eq!(card.status, HealthGrade::Excellent);
        assert_eq!(card.delivery_rate, 98.0);
    }

    #[test]
    fn heavy_failures_are_critical() {
        let card = calc()
            .calculate(ConnectionId(1), ScoreWindow::Last24h, &stats(1000, 600, 400))
            .unwrap();
        assert_eq!(card.failure_rate, 40.0);
        assert_eq!(card.sub_scores.delivery, 20.0);
        assert_eq!(card.sub_scores.failure, 0.0);
        assert_eq!(card.score, 28.0);
        assert_eq!(card.status, HealthGrade::Critical);
    }

    #[test]
    fn zero_sent_is_insufficient() {
        let err = calc()
            .calculate(ConnectionId(4), ScoreWindow::Last7d, &stats(0, 0, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            GovernorError::InsufficientData {
                connection_id: ConnectionId(4),
                window: ScoreWindow::Last7d
            }
        ));
    }

    #[test]
    fn delivery_bands_interpolate() {
        let b = ScoringConfig::default().delivery;
        assert_eq!(higher_is_better(100.0, &b), 100.0);
        assert_eq!(higher_is_better(95.0, &b), 90.0);
        assert_eq!(higher_is_better(90.0, &b), 80.0);
        assert_eq!(higher_is_better(85.0, &b), 70.0);
        assert_eq!(higher_is_better(70.0, &b), 40.0);
        assert_eq!(higher_is_better(50.0, &b), 0.0);
        assert_eq!(higher_is_better(10.0, &b), 0.0);
    }

    #[test]
    fn failure_bands_interpolate() {
        let b = ScoringConfig::default().failure;
        assert_eq!(lower_is_better(0.0, &b), 100.0);
        assert_eq!(lower_is_better(2.0, &b), 90.0);
        assert_eq!(lower_is_better(5.0, &b), 70.0);
        assert_eq!(lower_is_better(10.0, &b), 40.0);
        assert_eq!(lower_is_better(20.0, &b), 20.0);
        assert_eq!(lower_is_better(45.0, &b), 0.0);
    }

    #[test]
    fn user_signals_are_neutral_when_absent() {
        let c = calc();
        let mut s = stats(1000, 1000, 0);
        assert_eq!(c.user_signal_score(&s), 100.0);
        s.user_signals = Some(UserSignals {
            blocked: 5,
            reported: 5,
        });
        // 1% block+report rate sits on the warning edge.
        assert_eq!(c.user_signal_score(&s), 40.0);
    }

    #[test]
    fn smooth_cadence_scores_full() {
        let c = calc();
        assert_eq!(c.pattern_score(&[10, 10, 10, 10]), 100.0);
        assert_eq!(c.pattern_score(&[5]), 100.0);
        assert_eq!(c.pattern_score(&[0, 0, 0]), 100.0);
    }

    #[test]
    fn bursty_cadence_is_penalized() {
        let c = calc();
        let mut hours = vec![0u64; 24];
        hours[3] = 240;
        // cv = sqrt(23) ~ 4.8, past the bursty edge
        assert_eq!(c.pattern_score(&hours), 0.0);
        let partial = c.pattern_score(&[10, 0, 10, 0, 10, 0]);
        assert!(partial > 0.0 && partial < 100.0, "got {partial}");
    }

    #[test]
    fn template_concentration_is_penalized() {
        let c = calc();
        assert_eq!(c.template_mix_score(&[]), 100.0);
        assert_eq!(c.template_mix_score(&[50, 50]), 100.0);
        assert_eq!(c.template_mix_score(&[100]), 40.0);
        assert!((c.template_mix_score(&[80, 20]) - 70.0).abs() < 1e-9);
    }

    #[test]
    fn grades_follow_cut_points() {
        let c = calc();
        assert_eq!(c.grade(90.0), HealthGrade::Excellent);
        assert_eq!(c.grade(89.99), HealthGrade::Good);
        assert_eq!(c.grade(70.0), HealthGrade::Good);
        assert_eq!(c.grade(50.0), HealthGrade::Warning);
        assert_eq!(c.grade(49.99), HealthGrade::Critical);
    }
}
