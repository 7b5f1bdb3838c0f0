// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the orderings and ranges the scoring, policy, and warmup logic
//! rely on. All failures are collected; validation does not fail fast.

use crate::diagnostic::ConfigError;
use crate::model::{BandEdges, WaguardConfig};

const WEIGHT_TOLERANCE: f64 = 0.001;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &WaguardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.gateway.host.trim().is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let host = config.gateway.host.trim();
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }
    if let Some(token) = &config.gateway.bearer_token
        && token.trim().is_empty()
    {
        fail("gateway.bearer_token must not be empty when set".to_string());
    }

    let sched = &config.scheduler;
    if sched.interval_secs == 0 {
        fail("scheduler.interval_secs must be at least 1".to_string());
    }
    if sched.max_concurrency == 0 {
        fail("scheduler.max_concurrency must be at least 1".to_string());
    }
    if sched.telemetry_timeout_secs == 0 {
        fail("scheduler.telemetry_timeout_secs must be at least 1".to_string());
    }
    if sched.queue_capacity == 0 {
        fail("scheduler.queue_capacity must be at least 1".to_string());
    }

    let weights = &config.scoring.weights;
    let all_weights = [
        ("delivery", weights.delivery),
        ("failure", weights.failure),
        ("user_signal", weights.user_signal),
        ("pattern", weights.pattern),
        ("template_mix", weights.template_mix),
    ];
    for (name, w) in all_weights {
        if !(0.0..=1.0).contains(&w) {
            fail(format!("scoring.weights.{name} must be within 0..=1, got {w}"));
        }
    }
    if (weights.sum() - 1.0).abs() > WEIGHT_TOLERANCE {
        fail(format!(
            "scoring.weights must sum to 1.0, got {:.4}",
            weights.sum()
        ));
    }

    let grades = &config.scoring.grades;
    if !(grades.excellent <= 100.0
        && grades.excellent > grades.good
        && grades.good > grades.warning
        && grades.warning > 0.0)
    {
        fail(format!(
            "scoring.grades must satisfy 100 >= excellent > good > warning > 0, got {} / {} / {}",
            grades.excellent, grades.good, grades.warning
        ));
    }

    check_bands("scoring.delivery", &config.scoring.delivery, true, 100.0, &mut fail);
    check_bands("scoring.failure", &config.scoring.failure, false, 100.0, &mut fail);
    check_bands(
        "scoring.user_signal",
        &config.scoring.user_signal,
        false,
        100.0,
        &mut fail,
    );

    let pattern = &config.scoring.pattern;
    if !(pattern.smooth_cv >= 0.0 && pattern.bursty_cv > pattern.smooth_cv) {
        fail(format!(
            "scoring.pattern requires 0 <= smooth_cv < bursty_cv, got {} / {}",
            pattern.smooth_cv, pattern.bursty_cv
        ));
    }
    let mix = &config.scoring.template_mix;
    if !(mix.max_healthy_share > 0.0 && mix.max_healthy_share < 1.0) {
        fail(format!(
            "scoring.template_mix.max_healthy_share must be within (0, 1), got {}",
            mix.max_healthy_share
        ));
    }
    if !(0.0..=100.0).contains(&mix.floor_score) {
        fail(format!(
            "scoring.template_mix.floor_score must be within 0..=100, got {}",
            mix.floor_score
        ));
    }

    let policy = &config.policy;
    let thresholds = [
        policy.reduce_batch_score,
        policy.add_delay_score,
        policy.pause_campaign_score,
        policy.pause_warmup_score,
        policy.block_reconnect_score,
    ];
    if !thresholds.windows(2).all(|pair| pair[0] > pair[1])
        || thresholds.iter().any(|t| !(0.0..=100.0).contains(t))
    {
        fail(format!(
            "policy thresholds must be strictly descending within 0..=100 \
             (reduce_batch > add_delay > pause_campaign > pause_warmup > block_reconnect), \
             got {thresholds:?}"
        ));
    }
    if policy.hysteresis_margin < 0.0 {
        fail(format!(
            "policy.hysteresis_margin must be non-negative, got {}",
            policy.hysteresis_margin
        ));
    }
    if policy.reduced_batch_size == 0 {
        fail("policy.reduced_batch_size must be at least 1".to_string());
    }
    if policy.reconnect_block_hours < 1 {
        fail("policy.reconnect_block_hours must be at least 1".to_string());
    }

    let warmup = &config.warmup;
    if warmup.stable_after_days <= warmup.warming_after_days {
        fail(format!(
            "warmup.stable_after_days ({}) must exceed warmup.warming_after_days ({})",
            warmup.stable_after_days, warmup.warming_after_days
        ));
    }
    if warmup.age_curve.is_empty() {
        fail("warmup.age_curve must have at least one step".to_string());
    } else {
        if warmup.age_curve[0].min_age_days != 0 {
            fail("warmup.age_curve must start at min_age_days = 0".to_string());
        }
        let ascending = warmup.age_curve.windows(2).all(|pair| {
            pair[0].min_age_days < pair[1].min_age_days
                && pair[0].daily_limit <= pair[1].daily_limit
        });
        if !ascending {
            fail(
                "warmup.age_curve must be ascending in age and non-decreasing in limit"
                    .to_string(),
            );
        }
    }
    if !(1..=100).contains(&warmup.hourly_share_pct) {
        fail(format!(
            "warmup.hourly_share_pct must be within 1..=100, got {}",
            warmup.hourly_share_pct
        ));
    }
    if warmup.stable_hourly_limit > warmup.stable_daily_limit {
        fail("warmup.stable_hourly_limit must not exceed warmup.stable_daily_limit".to_string());
    }
    if warmup.new_hourly_limit > warmup.new_daily_limit {
        fail("warmup.new_hourly_limit must not exceed warmup.new_daily_limit".to_string());
    }
    if warmup.cooldown_hourly_limit > warmup.cooldown_daily_limit {
        fail(
            "warmup.cooldown_hourly_limit must not exceed warmup.cooldown_daily_limit".to_string(),
        );
    }
    if warmup.auto_cooldown_hours < 1 {
        fail("warmup.auto_cooldown_hours must be at least 1".to_string());
    }
    if !(1 <= warmup.force_cooldown_min_hours
        && warmup.force_cooldown_min_hours <= warmup.force_cooldown_max_hours)
    {
        fail(format!(
            "warmup.force_cooldown bounds must satisfy 1 <= min <= max, got {}..={}",
            warmup.force_cooldown_min_hours, warmup.force_cooldown_max_hours
        ));
    }
    if warmup.relapse_limit == 0 {
        fail("warmup.relapse_limit must be at least 1".to_string());
    }
    if warmup.relapse_window_days < 1 {
        fail("warmup.relapse_window_days must be at least 1".to_string());
    }

    let trend = &config.trend;
    if trend.flat_band < 0.0 {
        fail(format!("trend.flat_band must be non-negative, got {}", trend.flat_band));
    }
    if trend.default_days == 0 || trend.default_days > trend.max_days {
        fail(format!(
            "trend.default_days must be within 1..={}, got {}",
            trend.max_days, trend.default_days
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Edges must be strictly monotone (descending when higher is better) and within `0..=max`.
fn check_bands(
    name: &str,
    bands: &BandEdges,
    higher_is_better: bool,
    max: f64,
    fail: &mut impl FnMut(String),
) {
    let edges = [bands.excellent, bands.good, bands.warning, bands.floor];
    let ordered = edges.windows(2).all(|pair| {
        if higher_is_better {
            pair[0] > pair[1]
        } else {
            pair[0] < pair[1]
        }
    });
    let in_range = edges.iter().all(|e| (0.0..=max).contains(e));
    if !ordered || !in_range {
        let direction = if higher_is_better {
            "descending"
        } else {
            "ascending"
        };
        fail(format!(
            "{name} edges (excellent, good, warning, floor) must be strictly {direction} \
             within 0..={max}, got {edges:?}"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &WaguardConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&WaguardConfig::default()).is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut config = WaguardConfig::default();
        config.scoring.weights.delivery = 0.5;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("sum to 1.0")), "{msgs:?}");
    }

    #[test]
    fn policy_thresholds_must_descend() {
        let mut config = WaguardConfig::default();
        config.policy.pause_warmup_score = 50.0;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("policy thresholds")));
    }

    #[test]
    fn failure_bands_must_ascend() {
        let mut config = WaguardConfig::default();
        config.scoring.failure.good = 1.0;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("scoring.failure")));
    }

    #[test]
    fn collects_every_error() {
        let mut config = WaguardConfig::default();
        config.scheduler.max_concurrency = 0;
        config.warmup.age_curve.clear();
        config.storage.database_path = " ".to_string();
        assert_eq!(messages(&config).len(), 3);
    }

    #[test]
    fn cooldown_bounds_must_be_ordered() {
        let mut config = WaguardConfig::default();
        config.warmup.force_cooldown_min_hours = 200;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("force_cooldown")));
    }
}
