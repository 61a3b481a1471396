//! Authentication HTTP handlers.
//!
//! Sessions are returned as `{ token, caller, expires_at_utc }`; clients send
//! the token back as `Authorization: Bearer <token>`.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use brevity_core::{Caller, Credentials, Session};

use crate::extract::{BearerToken, RequireCaller};
use crate::services::oauth::PROVIDER_GOOGLE;
use crate::{ApiError, AppState};

/// Email and password body shared by register and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl From<CredentialsBody> for Credentials {
    fn from(body: CredentialsBody) -> Self {
        Credentials::new(body.email, body.password)
    }
}

/// Query string of the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user declines consent.
    pub error: Option<String>,
}

/// Register a new account.
///
/// # Returns
/// - 201 Created with the new session
/// - 422 Unprocessable Entity if the email or password fails validation, or
///   the email is already registered
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let Json(body) = body?;
    let session = state.auth.register(body.into()).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Sign in with email and password.
///
/// # Returns
/// - 200 OK with a new session
/// - 401 Unauthorized with "Invalid login credentials"
/// - 422 Unprocessable Entity if the email is malformed
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let Json(body) = body?;
    let session = state.auth.login(body.into()).await?;
    Ok(Json(session))
}

/// End the current session.
///
/// # Returns
/// - 204 No Content, whether or not the token was known
pub async fn logout(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<StatusCode, ApiError> {
    state.auth.logout(token.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller behind the current session.
///
/// # Returns
/// - 200 OK with `{ id, email }`
/// - 401 Unauthorized without a live session
pub async fn me(auth: RequireCaller) -> Json<Caller> {
    Json(auth.caller)
}

/// Start Google sign-in.
///
/// # Returns
/// - 200 OK with `{ "url": "<consent url>" }`
/// - 404 Not Found if Google sign-in is not configured
pub async fn google_authorize(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("OAuth provider not configured".to_string()))?;
    let url = oauth.authorize_url()?;
    Ok(Json(serde_json::json!({ "url": url })))
}

/// Finish Google sign-in.
///
/// # Returns
/// - 200 OK with a session for the verified email
/// - 401 Unauthorized if consent was declined, the state is invalid or
///   expired, or the account has no verified email
/// - 404 Not Found if Google sign-in is not configured
/// - 422 Unprocessable Entity if `code` or `state` is missing
/// - 502 Bad Gateway if the provider cannot be reached
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Json<Session>, ApiError> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("OAuth provider not configured".to_string()))?;

    if let Some(error) = query.error {
        tracing::debug!(subsystem = "api", component = "oauth", error = %error, "Provider returned an error");
        return Err(ApiError::Unauthorized("Sign-in was cancelled".to_string()));
    }
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return Err(ApiError::Validation {
            field: Some("code".to_string()),
            message: "Missing authorization code".to_string(),
        });
    };

    let email = oauth.exchange_code(&code, &oauth_state).await?;
    let session = state.auth.external(PROVIDER_GOOGLE, &email).await?;
    Ok(Json(session))
}
