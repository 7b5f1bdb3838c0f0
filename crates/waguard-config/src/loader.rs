// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `/etc/waguard/waguard.toml`, then `~/.config/waguard/waguard.toml`,
//! then `./waguard.toml`, then `WAGUARD_*` environment variables.

// figment::Error is external and cannot be boxed without a wrapper.
#![allow(clippy::result_large_err)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::WaguardConfig;

/// Env key prefixes mapped to dotted section paths. Nested sections come
/// before their parent so `scoring_weights_delivery` resolves to
/// `scoring.weights.delivery` rather than `scoring.weights_delivery`.
const SECTION_PREFIXES: &[(&str, &str)] = &[
    ("scoring_weights_", "scoring.weights."),
    ("scoring_grades_", "scoring.grades."),
    ("scoring_delivery_", "scoring.delivery."),
    ("scoring_failure_", "scoring.failure."),
    ("scoring_user_signal_", "scoring.user_signal."),
    ("scoring_pattern_", "scoring.pattern."),
    ("scoring_template_mix_", "scoring.template_mix."),
    ("service_", "service."),
    ("storage_", "storage."),
    ("gateway_", "gateway."),
    ("scheduler_", "scheduler."),
    ("scoring_", "scoring."),
    ("policy_", "policy."),
    ("warmup_", "warmup."),
    ("trend_", "trend."),
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/waguard/waguard.toml`
/// 3. `~/.config/waguard/waguard.toml`
/// 4. `./waguard.toml`
/// 5. `WAGUARD_*` environment variables
pub fn load_config() -> Result<WaguardConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<WaguardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaguardConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WaguardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaguardConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WaguardConfig::default()))
        .merge(Toml::file("/etc/waguard/waguard.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("waguard/waguard.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("waguard.toml"))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env key to its dotted config path.
pub fn map_env_key(key: &str) -> String {
    for (prefix, section) in SECTION_PREFIXES {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{section}{rest}");
        }
    }
    key.to_string()
}

/// Environment provider. Uses `Env::map()` rather than `Env::split("_")`
/// because field names themselves contain underscores.
fn env_provider() -> Env {
    Env::prefixed("WAGUARD_").map(|key| map_env_key(key.as_str()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("gateway_bearer_token"), "gateway.bearer_token");
        assert_eq!(
            map_env_key("scheduler_max_concurrency"),
            "scheduler.max_concurrency"
        );
        assert_eq!(
            map_env_key("policy_hysteresis_margin"),
            "policy.hysteresis_margin"
        );
    }

    #[test]
    fn nested_scoring_keys_map_to_subsections() {
        assert_eq!(
            map_env_key("scoring_weights_delivery"),
            "scoring.weights.delivery"
        );
        assert_eq!(
            map_env_key("scoring_template_mix_floor_score"),
            "scoring.template_mix.floor_score"
        );
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }
}
