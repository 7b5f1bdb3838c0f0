// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed queries, one module per table group.
//!
//! Functions taking `&rusqlite::Connection` run on the connection thread and
//! compose inside a transaction; the async ones wrap a single call.

pub mod connections;
pub mod scores;
pub mod telemetry;
pub mod warmups;
