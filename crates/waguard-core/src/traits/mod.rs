// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the governor is composed from.
//!
//! Each trait is a narrow, typed seam so tests can substitute
//! deterministic doubles for the SQLite adapters.

pub mod clock;
pub mod connection;
pub mod store;
pub mod telemetry;

pub use clock::{Clock, SystemClock};
pub use connection::ConnectionStore;
pub use store::GovernorStore;
pub use telemetry::TelemetrySource;
