// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token middleware and the owner actor extractor.
//!
//! With no token configured every admin request is rejected (fail-closed).

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};
use waguard_core::{Actor, GovernorError};

use crate::error::ApiError;

/// Header naming the owner on whose behalf an admin call is made.
pub const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Clone)]
pub struct AuthConfig {
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = auth.bearer_token.as_deref() else {
        tracing::error!("gateway has no bearer token configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let presented = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => {
            tracing::debug!(
                path = %request.uri().path(),
                "admin request rejected: bad bearer token"
            );
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// The owner actor named by `X-Actor-Id`.
///
/// Authorization of the actor itself happens upstream; the gateway only
/// attributes the action.
#[derive(Debug, Clone)]
pub struct OwnerActor(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for OwnerActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ApiError(GovernorError::InvalidRequest {
                    message: format!("missing {ACTOR_HEADER} header"),
                })
            })?;
        Ok(Self(Actor::owner(id)))
    }
}
