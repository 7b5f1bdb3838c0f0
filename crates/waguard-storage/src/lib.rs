// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the waguard governor.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! connection via `tokio-rusqlite`, the append-only ledger tables guarded by
//! triggers, and adapters implementing the core collaborator traits.

pub mod adapter;
pub mod database;
pub mod ledger;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
pub use models::{DeliveryStatus, MessageEvent};
