//! Caller identity
//!
//! Authentication itself happens upstream; handlers only ask an
//! `IdentityResolver` who the caller is. Production trusts the user id the
//! authentication proxy forwards in `x-user-id`. The fixed resolver exists for
//! local development and tests and is only selected by configuration.

use std::{convert::Infallible, sync::Arc};

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::{api::AppState, error::AppError};

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

pub trait IdentityResolver: Send + Sync {
    /// The caller's user id, or `None` when the request is unauthenticated
    fn resolve(&self, headers: &HeaderMap) -> Option<String>;
}

/// Reads the user id forwarded by the authentication proxy
#[derive(Debug, Clone, Default)]
pub struct HeaderIdentity;

impl IdentityResolver for HeaderIdentity {
    fn resolve(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ToOwned::to_owned)
    }
}

/// Resolves every request to the same user
#[derive(Debug, Clone)]
pub struct FixedIdentity {
    user_id: String,
}

impl FixedIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl IdentityResolver for FixedIdentity {
    fn resolve(&self, _headers: &HeaderMap) -> Option<String> {
        Some(self.user_id.clone())
    }
}

/// Authenticated caller; rejects with 401 otherwise
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

/// Caller identity when present
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<String>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        state
            .identity
            .resolve(&parts.headers)
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(state.identity.resolve(&parts.headers)))
    }
}
