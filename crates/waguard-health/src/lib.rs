// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure health math for the waguard governor.
//!
//! - [`score`]: telemetry to a 0..100 score and status grade.
//! - [`policy`]: score and warmup state to protective action flags, with hysteresis.
//! - [`trend`]: history points to an improving/declining/flat direction.
//!
//! Nothing in this crate performs I/O.

pub mod policy;
pub mod score;
pub mod trend;

pub use policy::{ActionChange, ActionPolicy, PolicyDecision};
pub use score::{HealthCalculator, ScoreCard};
pub use trend::{Trend, TrendAnalyzer};
