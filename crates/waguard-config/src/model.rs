// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the waguard governor.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. The numeric thresholds here are the contract
//! the scoring, policy, and warmup crates implement; they are fixed per
//! deployment and never hard-coded elsewhere.

use serde::{Deserialize, Serialize};
use waguard_core::ScoreWindow;

/// Top-level waguard configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WaguardConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Admin HTTP surface settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Periodic batch recompute settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Health score model.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Action policy thresholds and throttle values.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Warmup state machine and limit schedule.
    #[serde(default)]
    pub warmup: WarmupConfig,

    /// Trend analysis settings.
    #[serde(default)]
    pub trend: TrendConfig,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Instance name used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "waguard".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("waguard").join("waguard.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("waguard.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Admin HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Serve the admin API from `waguard serve`.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on every admin route. `None` rejects all admin calls.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8640
}

/// Batch recompute scheduling and resource bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Run the periodic batch job.
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,

    /// Seconds between batch runs.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Telemetry window the batch job scores over.
    #[serde(default)]
    pub window: ScoreWindow,

    /// Maximum connections recomputed in parallel.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Timeout on a single telemetry read.
    #[serde(default = "default_telemetry_timeout_secs")]
    pub telemetry_timeout_secs: u64,

    /// How long an operation waits for a connection's lock before giving up.
    #[serde(default = "default_lock_wait_secs")]
    pub lock_wait_secs: u64,

    /// Capacity of the queued-recompute channel.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            interval_secs: default_interval_secs(),
            window: ScoreWindow::default(),
            max_concurrency: default_max_concurrency(),
            telemetry_timeout_secs: default_telemetry_timeout_secs(),
            lock_wait_secs: default_lock_wait_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    900
}

fn default_max_concurrency() -> usize {
    8
}

fn default_telemetry_timeout_secs() -> u64 {
    10
}

fn default_lock_wait_secs() -> u64 {
    30
}

fn default_queue_capacity() -> usize {
    256
}

/// Health score model: weights, grade cut points, and per-signal bands.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoreWeights,

    #[serde(default)]
    pub grades: GradeThresholds,

    /// Delivery rate band edges in percent, higher is better.
    #[serde(default = "default_delivery_bands")]
    pub delivery: BandEdges,

    /// Failure rate band edges in percent, lower is better.
    #[serde(default = "default_failure_bands")]
    pub failure: BandEdges,

    /// Block+report rate band edges in percent, lower is better.
    #[serde(default = "default_user_signal_bands")]
    pub user_signal: BandEdges,

    #[serde(default)]
    pub pattern: PatternConfig,

    #[serde(default)]
    pub template_mix: TemplateMixConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            grades: GradeThresholds::default(),
            delivery: default_delivery_bands(),
            failure: default_failure_bands(),
            user_signal: default_user_signal_bands(),
            pattern: PatternConfig::default(),
            template_mix: TemplateMixConfig::default(),
        }
    }
}

/// Sub-score weights. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreWeights {
    pub delivery: f64,
    pub failure: f64,
    pub user_signal: f64,
    pub pattern: f64,
    pub template_mix: f64,
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.delivery + self.failure + self.user_signal + self.pattern + self.template_mix
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            delivery: 0.40,
            failure: 0.40,
            user_signal: 0.10,
            pattern: 0.05,
            template_mix: 0.05,
        }
    }
}

/// Minimum score for each status grade. Anything below `warning` is critical.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GradeThresholds {
    pub excellent: f64,
    pub good: f64,
    pub warning: f64,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            excellent: 90.0,
            good: 70.0,
            warning: 50.0,
        }
    }
}

/// Rate edges for one signal.
///
/// `excellent`, `good`, and `warning` bound the bands scoring 90..100,
/// 70..90, and 40..70; `floor` is where the critical band reaches 0.
/// For higher-is-better signals the edges descend, otherwise they ascend.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BandEdges {
    pub excellent: f64,
    pub good: f64,
    pub warning: f64,
    pub floor: f64,
}

fn default_delivery_bands() -> BandEdges {
    BandEdges {
        excellent: 95.0,
        good: 85.0,
        warning: 70.0,
        floor: 50.0,
    }
}

fn default_failure_bands() -> BandEdges {
    BandEdges {
        excellent: 2.0,
        good: 5.0,
        warning: 10.0,
        floor: 30.0,
    }
}

fn default_user_signal_bands() -> BandEdges {
    BandEdges {
        excellent: 0.1,
        good: 0.5,
        warning: 1.0,
        floor: 3.0,
    }
}

/// Send-cadence irregularity scoring, on the coefficient of variation of hourly sends.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PatternConfig {
    /// At or below this CV the cadence scores 100.
    #[serde(default = "default_smooth_cv")]
    pub smooth_cv: f64,

    /// At or above this CV the cadence scores 0.
    #[serde(default = "default_bursty_cv")]
    pub bursty_cv: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            smooth_cv: default_smooth_cv(),
            bursty_cv: default_bursty_cv(),
        }
    }
}

fn default_smooth_cv() -> f64 {
    0.5
}

fn default_bursty_cv() -> f64 {
    3.0
}

/// Template concentration scoring.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateMixConfig {
    /// Dominant-template share (0..1) at or below which the mix scores 100.
    #[serde(default = "default_max_healthy_share")]
    pub max_healthy_share: f64,

    /// Score when a single template carries all traffic.
    #[serde(default = "default_template_floor_score")]
    pub floor_score: f64,
}

impl Default for TemplateMixConfig {
    fn default() -> Self {
        Self {
            max_healthy_share: default_max_healthy_share(),
            floor_score: default_template_floor_score(),
        }
    }
}

fn default_max_healthy_share() -> f64 {
    0.6
}

fn default_template_floor_score() -> f64 {
    40.0
}

/// Action policy thresholds (score at or below which each action applies).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default = "default_reduce_batch_score")]
    pub reduce_batch_score: f64,

    #[serde(default = "default_add_delay_score")]
    pub add_delay_score: f64,

    #[serde(default = "default_pause_campaign_score")]
    pub pause_campaign_score: f64,

    #[serde(default = "default_pause_warmup_score")]
    pub pause_warmup_score: f64,

    #[serde(default = "default_block_reconnect_score")]
    pub block_reconnect_score: f64,

    /// An active action clears only once the score exceeds its threshold by this margin.
    #[serde(default = "default_hysteresis_margin")]
    pub hysteresis_margin: f64,

    /// Batch size the send pipeline uses while batch reduction is active.
    #[serde(default = "default_reduced_batch_size")]
    pub reduced_batch_size: u32,

    /// Delay between sends while added delay is active.
    #[serde(default = "default_added_delay_secs")]
    pub added_delay_secs: u32,

    /// How long a reconnect block advertises itself to the send pipeline.
    #[serde(default = "default_reconnect_block_hours")]
    pub reconnect_block_hours: i64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            reduce_batch_score: default_reduce_batch_score(),
            add_delay_score: default_add_delay_score(),
            pause_campaign_score: default_pause_campaign_score(),
            pause_warmup_score: default_pause_warmup_score(),
            block_reconnect_score: default_block_reconnect_score(),
            hysteresis_margin: default_hysteresis_margin(),
            reduced_batch_size: default_reduced_batch_size(),
            added_delay_secs: default_added_delay_secs(),
            reconnect_block_hours: default_reconnect_block_hours(),
        }
    }
}

fn default_reduce_batch_score() -> f64 {
    65.0
}

fn default_add_delay_score() -> f64 {
    55.0
}

fn default_pause_campaign_score() -> f64 {
    45.0
}

fn default_pause_warmup_score() -> f64 {
    40.0
}

fn default_block_reconnect_score() -> f64 {
    30.0
}

fn default_hysteresis_margin() -> f64 {
    5.0
}

fn default_reduced_batch_size() -> u32 {
    10
}

fn default_added_delay_secs() -> u32 {
    30
}

fn default_reconnect_block_hours() -> i64 {
    72
}

/// One step of the warming age curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgeStep {
    pub min_age_days: u32,
    pub daily_limit: u32,
}

/// Warmup state machine timing and limit tiers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WarmupConfig {
    #[serde(default = "default_new_daily_limit")]
    pub new_daily_limit: u32,

    #[serde(default = "default_new_hourly_limit")]
    pub new_hourly_limit: u32,

    /// Number age at which NEW may promote to WARMING.
    #[serde(default = "default_warming_after_days")]
    pub warming_after_days: u32,

    /// Number age at which WARMING may promote to STABLE.
    #[serde(default = "default_stable_after_days")]
    pub stable_after_days: u32,

    /// Minimum score for promotions and for limit increases while warming.
    #[serde(default = "default_promotion_min_score")]
    pub promotion_min_score: f64,

    /// Daily limit by number age while WARMING, ascending by age.
    #[serde(default = "default_age_curve")]
    pub age_curve: Vec<AgeStep>,

    /// Hourly limit as a percentage of the daily limit on the age curve.
    #[serde(default = "default_hourly_share_pct")]
    pub hourly_share_pct: u32,

    #[serde(default = "default_stable_daily_limit")]
    pub stable_daily_limit: u32,

    #[serde(default = "default_stable_hourly_limit")]
    pub stable_hourly_limit: u32,

    #[serde(default = "default_cooldown_daily_limit")]
    pub cooldown_daily_limit: u32,

    #[serde(default = "default_cooldown_hourly_limit")]
    pub cooldown_hourly_limit: u32,

    /// Length of an automatic health-drop cooldown.
    #[serde(default = "default_auto_cooldown_hours")]
    pub auto_cooldown_hours: i64,

    #[serde(default = "default_force_cooldown_min_hours")]
    pub force_cooldown_min_hours: i64,

    #[serde(default = "default_force_cooldown_max_hours")]
    pub force_cooldown_max_hours: i64,

    /// Health-drop cooldowns within `relapse_window_days` that escalate to SUSPENDED.
    #[serde(default = "default_relapse_limit")]
    pub relapse_limit: u32,

    #[serde(default = "default_relapse_window_days")]
    pub relapse_window_days: i64,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            new_daily_limit: default_new_daily_limit(),
            new_hourly_limit: default_new_hourly_limit(),
            warming_after_days: default_warming_after_days(),
            stable_after_days: default_stable_after_days(),
            promotion_min_score: default_promotion_min_score(),
            age_curve: default_age_curve(),
            hourly_share_pct: default_hourly_share_pct(),
            stable_daily_limit: default_stable_daily_limit(),
            stable_hourly_limit: default_stable_hourly_limit(),
            cooldown_daily_limit: default_cooldown_daily_limit(),
            cooldown_hourly_limit: default_cooldown_hourly_limit(),
            auto_cooldown_hours: default_auto_cooldown_hours(),
            force_cooldown_min_hours: default_force_cooldown_min_hours(),
            force_cooldown_max_hours: default_force_cooldown_max_hours(),
            relapse_limit: default_relapse_limit(),
            relapse_window_days: default_relapse_window_days(),
        }
    }
}

fn default_new_daily_limit() -> u32 {
    20
}

fn default_new_hourly_limit() -> u32 {
    5
}

fn default_warming_after_days() -> u32 {
    3
}

fn default_stable_after_days() -> u32 {
    28
}

fn default_promotion_min_score() -> f64 {
    70.0
}

fn default_age_curve() -> Vec<AgeStep> {
    vec![
        AgeStep {
            min_age_days: 0,
            daily_limit: 50,
        },
        AgeStep {
            min_age_days: 7,
            daily_limit: 150,
        },
        AgeStep {
            min_age_days: 14,
            daily_limit: 400,
        },
        AgeStep {
            min_age_days: 21,
            daily_limit: 800,
        },
    ]
}

fn default_hourly_share_pct() -> u32 {
    15
}

fn default_stable_daily_limit() -> u32 {
    1000
}

fn default_stable_hourly_limit() -> u32 {
    150
}

fn default_cooldown_daily_limit() -> u32 {
    25
}

fn default_cooldown_hourly_limit() -> u32 {
    5
}

fn default_auto_cooldown_hours() -> i64 {
    24
}

fn default_force_cooldown_min_hours() -> i64 {
    1
}

fn default_force_cooldown_max_hours() -> i64 {
    168
}

fn default_relapse_limit() -> u32 {
    3
}

fn default_relapse_window_days() -> i64 {
    14
}

/// Trend analysis configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TrendConfig {
    /// Mean-score difference (points) below which a trend is flat.
    #[serde(default = "default_flat_band")]
    pub flat_band: f64,

    #[serde(default = "default_trend_days")]
    pub default_days: u32,

    #[serde(default = "default_trend_max_days")]
    pub max_days: u32,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            flat_band: default_flat_band(),
            default_days: default_trend_days(),
            max_days: default_trend_max_days(),
        }
    }
}

fn default_flat_band() -> f64 {
    2.0
}

fn default_trend_days() -> u32 {
    7
}

fn default_trend_max_days() -> u32 {
    90
}
