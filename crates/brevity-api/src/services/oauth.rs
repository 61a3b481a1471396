//! Google sign-in through the OAuth 2.0 authorization-code redirect.
//!
//! ## Flow
//!
//! 1. [`GoogleOAuth::authorize_url`] builds the consent URL with a signed
//!    `state` parameter (`nonce.expires.signature`, HMAC-SHA256) and a PKCE
//!    S256 challenge. Nothing is stored server-side: the signature and expiry
//!    are the CSRF check, and the PKCE verifier is an HMAC of the nonce, so
//!    the callback can recompute it.
//! 2. The provider redirects back to `/api/v1/auth/oauth/google/callback`
//!    with `code` and `state`. [`GoogleOAuth::exchange_code`] verifies the
//!    state, trades the code and verifier for an access token and reads the verified email
//!    from the userinfo endpoint.
//! 3. The caller hands the email to the identity provider, which creates the
//!    account on first sight and opens a session.

use std::time::Duration;

use hmac::{Hmac, Mac};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RequestTokenError, Scope, TokenResponse,
    TokenUrl,
};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, warn};

use brevity_core::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// OAuth client with the authorization and token endpoints set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

pub const PROVIDER_GOOGLE: &str = "google";
pub const CALLBACK_PATH: &str = "/api/v1/auth/oauth/google/callback";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const STATE_TTL_SECS: i64 = 600;
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Google client settings.
#[derive(Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    /// Key for signing the `state` parameter and deriving PKCE verifiers.
    pub state_secret: Vec<u8>,
}

impl std::fmt::Debug for GoogleOAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish()
    }
}

impl GoogleOAuthConfig {
    /// Settings with Google's public endpoints and a redirect under `site_url`.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        site_url: &str,
        state_secret: Vec<u8>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: format!("{}{}", site_url.trim_end_matches('/'), CALLBACK_PATH),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            state_secret,
        }
    }

    /// Read `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET` and `OAUTH_STATE_SECRET`.
    ///
    /// Returns `None` (OAuth disabled) when the client id or secret is missing.
    /// Without `OAUTH_STATE_SECRET` a random per-process key is used, so
    /// redirects started before a restart fail their state check.
    pub fn from_env(site_url: &str) -> Option<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok().filter(|s| !s.is_empty());
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let (Some(client_id), Some(client_secret)) = (client_id, client_secret) else {
            warn!(
                subsystem = "api",
                component = "oauth",
                "GOOGLE_CLIENT_ID or GOOGLE_CLIENT_SECRET not set; Google sign-in disabled"
            );
            return None;
        };

        let state_secret = match std::env::var("OAUTH_STATE_SECRET") {
            Ok(secret) if !secret.is_empty() => secret.into_bytes(),
            _ => {
                warn!(
                    subsystem = "api",
                    component = "oauth",
                    "OAUTH_STATE_SECRET not set; using a per-process random key"
                );
                rand::random::<[u8; 32]>().to_vec()
            }
        };

        Some(Self::new(client_id, client_secret, site_url, state_secret))
    }
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuth {
    config: GoogleOAuthConfig,
    client: ConfiguredClient,
    http: reqwest::Client,
}

impl std::fmt::Debug for GoogleOAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOAuth")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn config_error(what: &str) -> impl Fn(oauth2::url::ParseError) -> Error + '_ {
    move |e| Error::Config(format!("Invalid Google OAuth {what}: {e}"))
}

impl GoogleOAuth {
    pub fn new(config: GoogleOAuthConfig) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(config.auth_url.clone()).map_err(config_error("auth URL"))?)
            .set_token_uri(
                TokenUrl::new(config.token_url.clone()).map_err(config_error("token URL"))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_url.clone())
                    .map_err(config_error("redirect URL"))?,
            );

        // Following redirects from the token endpoint would leak the code.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build OAuth HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            http,
        })
    }

    pub fn config(&self) -> &GoogleOAuthConfig {
        &self.config
    }

    /// Consent URL requesting offline access and the `openid email` scope,
    /// with a PKCE S256 challenge.
    pub fn authorize_url(&self) -> Result<String> {
        let nonce = hex::encode(rand::random::<[u8; 16]>());
        let state = self.sign_state(&nonce, chrono::Utc::now().timestamp() + STATE_TTL_SECS)?;
        let challenge = PkceCodeChallenge::from_code_verifier_sha256(&self.pkce_verifier(&nonce)?);

        let (url, _) = self
            .client
            .authorize_url(|| CsrfToken::new(state))
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(challenge)
            .url();
        Ok(url.to_string())
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.config.state_secret)
            .map_err(|e| Error::Config(format!("Invalid OAuth state key: {e}")))
    }

    fn sign_state(&self, nonce: &str, expires_at: i64) -> Result<String> {
        let payload = format!("{nonce}.{expires_at}");
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// PKCE verifier bound to a state nonce. 64 hex chars.
    fn pkce_verifier(&self, nonce: &str) -> Result<PkceCodeVerifier> {
        let mut mac = self.mac()?;
        mac.update(b"pkce:");
        mac.update(nonce.as_bytes());
        Ok(PkceCodeVerifier::new(hex::encode(
            mac.finalize().into_bytes(),
        )))
    }

    /// Check the signature and expiry of a `state` value and return its nonce.
    pub fn verify_state<'a>(&self, state: &'a str) -> Result<&'a str> {
        let invalid = || Error::Unauthenticated("Invalid or expired sign-in request".to_string());

        let (payload, signature) = state.rsplit_once('.').ok_or_else(invalid)?;
        let (nonce, expires_at) = payload.split_once('.').ok_or_else(invalid)?;
        let expires_at: i64 = expires_at.parse().map_err(|_| invalid())?;
        let signature = hex::decode(signature).map_err(|_| invalid())?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| invalid())?;

        if expires_at < chrono::Utc::now().timestamp() {
            debug!(subsystem = "api", component = "oauth", "Expired OAuth state");
            return Err(invalid());
        }
        Ok(nonce)
    }

    /// Verify `state`, redeem `code` and return the account's verified email.
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<String> {
        let nonce = self.verify_state(state)?;

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(self.pkce_verifier(nonce)?)
            .request_async(&self.http)
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(resp) => Error::Unauthenticated(format!(
                    "Google rejected the authorization code: {}",
                    resp.error()
                )),
                other => Error::Upstream(format!("Google token exchange failed: {other}")),
            })?;

        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(token.access_token().secret())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "Google userinfo request failed ({})",
                response.status()
            )));
        }
        let info: GoogleUserInfo = response.json().await?;

        match info.email {
            Some(email) if info.email_verified => Ok(email),
            _ => Err(Error::Unauthenticated(
                "Google account has no verified email address".to_string(),
            )),
        }
    }
}
