// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin HTTP surface for the governor.
//!
//! Every route under `/v1/health` requires the configured bearer token and
//! maps [`GovernorError`](waguard_core::GovernorError) kinds onto HTTP
//! statuses with a `{"error": {"kind", "message"}}` body. `/healthz` and
//! `/metrics` are public.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::{AuthConfig, OwnerActor};
pub use error::ApiError;
pub use server::{router, start_server, GatewayState, HealthState, ServerConfig};
