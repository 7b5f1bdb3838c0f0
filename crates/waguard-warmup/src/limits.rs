// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily and hourly send limits by warmup state and number age.

use waguard_config::model::WarmupConfig;
use waguard_core::{Limits, WarmupState};

#[derive(Debug, Clone)]
pub struct LimitSchedule {
    config: WarmupConfig,
}

impl LimitSchedule {
    pub fn new(config: WarmupConfig) -> Self {
        Self { config }
    }

    /// Limits for a fresh number.
    pub fn initial(&self) -> Limits {
        Limits {
            daily: self.config.new_daily_limit,
            hourly: self.config.new_hourly_limit,
        }
    }

    /// Age-curve limits for WARMING, ignoring the score gate.
    pub fn curve(&self, age_days: u32) -> Limits {
        let daily = self
            .config
            .age_curve
            .iter()
            .take_while(|step| step.min_age_days <= age_days)
            .last()
            .map(|step| step.daily_limit)
            .unwrap_or(self.config.new_daily_limit);
        Limits {
            daily,
            hourly: hourly_share(daily, self.config.hourly_share_pct),
        }
    }

    /// Target limits for `state`.
    ///
    /// In WARMING the curve only raises limits while `score` meets the
    /// promotion minimum; otherwise `current` is held, bounded by the
    /// new-number tier below and the curve above.
    pub fn limits_for(
        &self,
        state: WarmupState,
        age_days: u32,
        score: Option<f64>,
        current: Limits,
    ) -> Limits {
        let c = &self.config;
        match state {
            WarmupState::New => self.initial(),
            WarmupState::Warming => {
                let target = self.curve(age_days);
                let healthy = score.is_some_and(|s| s >= c.promotion_min_score);
                if healthy {
                    target
                } else {
                    let floor = self.initial();
                    Limits {
                        daily: current.daily.min(target.daily).max(floor.daily.min(target.daily)),
                        hourly: current
                            .hourly
                            .min(target.hourly)
                            .max(floor.hourly.min(target.hourly)),
                    }
                }
            }
            WarmupState::Stable => Limits {
                daily: c.stable_daily_limit,
                hourly: c.stable_hourly_limit,
            },
            WarmupState::Cooldown => Limits {
                daily: c.cooldown_daily_limit,
                hourly: c.cooldown_hourly_limit,
            },
            WarmupState::Suspended => Limits {
                daily: 0,
                hourly: 0,
            },
        }
    }
}

fn hourly_share(daily: u32, pct: u32) -> u32 {
    let hourly = (u64::from(daily) * u64::from(pct) / 100) as u32;
    hourly.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> LimitSchedule {
        LimitSchedule::new(WarmupConfig::default())
    }

    #[test]
    fn curve_steps_by_age() {
        let s = schedule();
        assert_eq!(s.curve(0), Limits { daily: 50, hourly: 7 });
        assert_eq!(s.curve(6).daily, 50);
        assert_eq!(s.curve(7), Limits { daily: 150, hourly: 22 });
        assert_eq!(s.curve(20).daily, 400);
        assert_eq!(s.curve(400), Limits { daily: 800, hourly: 120 });
    }

    #[test]
    fn fixed_tiers() {
        let s = schedule();
        let any = Limits { daily: 1, hourly: 1 };
        assert_eq!(
            s.limits_for(WarmupState::New, 2, Some(99.0), any),
            Limits { daily: 20, hourly: 5 }
        );
        assert_eq!(
            s.limits_for(WarmupState::Stable, 40, None, any),
            Limits { daily: 1000, hourly: 150 }
        );
        assert_eq!(
            s.limits_for(WarmupState::Cooldown, 40, Some(10.0), any),
            Limits { daily: 25, hourly: 5 }
        );
        assert_eq!(
            s.limits_for(WarmupState::Suspended, 40, Some(99.0), any),
            Limits { daily: 0, hourly: 0 }
        );
    }

    #[test]
    fn warming_holds_without_healthy_score() {
        let s = schedule();
        let current = Limits { daily: 150, hourly: 22 };
        assert_eq!(
            s.limits_for(WarmupState::Warming, 15, Some(65.0), current),
            current
        );
        assert_eq!(
            s.limits_for(WarmupState::Warming, 15, Some(85.0), current),
            Limits { daily: 400, hourly: 60 }
        );
        // holding never exceeds the curve
        let high = Limits { daily: 1000, hourly: 150 };
        assert_eq!(
            s.limits_for(WarmupState::Warming, 3, None, high),
            Limits { daily: 50, hourly: 7 }
        );
    }

    #[test]
    fn held_limits_never_drop_below_new_tier() {
        let s = schedule();
        let suspended = Limits { daily: 0, hourly: 0 };
        assert_eq!(
            s.limits_for(WarmupState::Warming, 30, Some(20.0), suspended),
            Limits { daily: 20, hourly: 5 }
        );
    }

    #[test]
    fn hourly_is_at_least_one() {
        assert_eq!(hourly_share(3, 15), 1);
        assert_eq!(hourly_share(0, 15), 1);
    }
}
