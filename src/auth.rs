// src/auth.rs
//! Caller identity. Sign-in lives with the hosted auth provider in front of
//! this service; it forwards the authenticated user's id in `x-user-id`.
use axum::extract::FromRequestParts;
use http::{request::Parts, HeaderName};
use tracing::warn;
use uuid::Uuid;

use crate::error::PollError;

pub static USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// The caller's id, or `None` for anonymous requests.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<Uuid>);

/// A signed-in caller; anonymous requests are rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

fn user_from_parts(parts: &Parts) -> Result<Option<Uuid>, PollError> {
    let Some(value) = parts.headers.get(&USER_ID_HEADER) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .map(Some)
        .ok_or_else(|| {
            warn!("malformed {} header", USER_ID_HEADER);
            PollError::Unauthorized
        })
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = PollError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_from_parts(parts).map(MaybeUser)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = PollError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_from_parts(parts)?
            .map(AuthUser)
            .ok_or(PollError::Unauthorized)
    }
}
