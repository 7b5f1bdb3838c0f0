// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trend direction over score history.

use serde::Serialize;
use waguard_config::model::TrendConfig;
use waguard_core::{HealthHistoryPoint, TrendDirection};

/// Ordered history points and their overall direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub days: u32,
    pub direction: TrendDirection,
    /// Mean of the later half minus mean of the earlier half, in score points.
    pub change: f64,
    pub points: Vec<HealthHistoryPoint>,
}

#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    /// Requested day count, defaulted and clamped to `1..=max_days`.
    pub fn clamp_days(&self, days: Option<u32>) -> u32 {
        days.unwrap_or(self.config.default_days)
            .clamp(1, self.config.max_days)
    }

    /// Compare the mean score of the earlier half of `points` with the later half.
    ///
    /// `points` must be oldest first. Fewer than two points is always flat.
    pub fn analyze(&self, days: u32, points: Vec<HealthHistoryPoint>) -> Trend {
        if points.len() < 2 {
            return Trend {
                days,
                direction: TrendDirection::Flat,
                change: 0.0,
                points,
            };
        }

        let (earlier, later) = points.split_at(points.len() / 2);
        let change = mean(later) - mean(earlier);
        let direction = if change.abs() <= self.config.flat_band {
            TrendDirection::Flat
        } else if change > 0.0 {
            TrendDirection::Improving
        } else {
            TrendDirection::Declining
        };

        Trend {
            days,
            direction,
            change: (change * 100.0).round() / 100.0,
            points,
        }
    }
}

fn mean(points: &[HealthHistoryPoint]) -> f64 {
    points.iter().map(|p| p.score).sum::<f64>() / points.len() as f64
}
