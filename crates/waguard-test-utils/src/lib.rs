// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for waguard governor tests.
//!
//! Provides deterministic implementations of the collaborator traits so the
//! governor can be driven without SQLite or a real clock.
//!
//! # Components
//!
//! - [`MockTelemetry`] - scripted message stats with injectable delay and failure
//! - [`MemoryStore`] - in-memory connection and governor store with commit fault injection
//! - [`ManualClock`] - clock that only moves when told to
//! - [`fixtures`] - connection and stats builders for common scenarios

pub mod clock;
pub mod fixtures;
pub mod memory_store;
pub mod mock_telemetry;

pub use clock::ManualClock;
pub use memory_store::MemoryStore;
pub use mock_telemetry::MockTelemetry;
