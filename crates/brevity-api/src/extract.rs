//! Request extractors for session tokens.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use brevity_core::Caller;

use crate::{ApiError, AppState};

/// Session token from `Authorization: Bearer <token>`, if any.
///
/// Never rejects; operations that need a caller decide what a missing token
/// means.
#[derive(Debug, Clone, Default)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    fn from_parts(parts: &Parts) -> Self {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        BearerToken(token)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Extractor that requires a live session.
///
/// Rejects with 401 "Not authenticated" when the token is missing, unknown
/// or expired.
#[derive(Debug, Clone)]
pub struct RequireCaller {
    pub caller: Caller,
    pub token: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_parts(parts);
        let caller = state.auth.current_caller(token.as_deref()).await?;
        Ok(RequireCaller {
            caller,
            token: token.unwrap_or_default(),
        })
    }
}
