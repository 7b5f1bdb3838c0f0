// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-number warmup lifecycle.
//!
//! [`transitions`] is the guarded table every state change goes through,
//! [`limits`] derives daily/hourly send limits from state and age, and
//! [`machine`] combines both into automatic evaluation and owner operations.
//! The machine is pure: it returns the new warmup record plus the ledger
//! rows describing the change, and the caller commits them.

pub mod limits;
pub mod machine;
pub mod transitions;

pub use limits::LimitSchedule;
pub use machine::{MachineOutcome, Observation, WarmupMachine};
pub use transitions::{guard, is_allowed, TransitionRule, TRANSITIONS};
