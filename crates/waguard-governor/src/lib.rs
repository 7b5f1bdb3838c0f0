// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The number health and warmup governor.
//!
//! [`Governor`] composes the score calculator, the action policy, and the
//! warmup state machine over the collaborator traits from `waguard-core`.
//! Every mutating operation runs under a per-connection lock and commits a
//! single [`Changeset`](waguard_core::Changeset), so the throttle fields the
//! send pipeline reads never drift from the ledger rows that explain them.

mod effects;

pub mod batch;
pub mod locks;
pub mod metrics;
pub mod queue;
pub mod service;
pub mod views;

pub use batch::{BatchReport, ConnectionOutcome, OutcomeResult};
pub use locks::{ConnectionGuard, ConnectionLocks};
pub use queue::{RecalcQueue, RecalcRequest, RecalcResponse};
pub use service::{Collaborators, Governor};
pub use views::{AttentionItem, ConnectionDetail, HealthSummary, StatusCounts};
