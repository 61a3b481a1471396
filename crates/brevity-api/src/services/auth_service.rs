//! Sign-up, sign-in and session lookup on top of an [`IdentityProvider`].

use std::sync::Arc;

use tracing::{debug, info};

use brevity_core::{
    validate_login, validate_registration, Caller, Credentials, Error, IdentityProvider, Result,
    Session,
};

#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
}

impl AuthService {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        self.identity.clone()
    }

    /// Register with the registration schema, then open a session.
    pub async fn register(&self, credentials: Credentials) -> Result<Session> {
        validate_registration(&credentials)?;
        let session = self.identity.sign_up(&credentials).await?;
        info!(
            subsystem = "api",
            component = "auth",
            user_id = %session.caller.id,
            "Account registered"
        );
        Ok(session)
    }

    pub async fn login(&self, credentials: Credentials) -> Result<Session> {
        validate_login(&credentials)?;
        let session = self.identity.sign_in(&credentials).await?;
        debug!(
            subsystem = "api",
            component = "auth",
            user_id = %session.caller.id,
            "Signed in"
        );
        Ok(session)
    }

    /// End the session if there is one. Without a token this is a no-op.
    pub async fn logout(&self, token: Option<&str>) -> Result<()> {
        match token {
            Some(token) => self.identity.sign_out(token).await,
            None => Ok(()),
        }
    }

    pub async fn current_caller(&self, token: Option<&str>) -> Result<Caller> {
        match token {
            Some(token) => self.identity.current_caller(token).await,
            None => Err(Error::not_authenticated()),
        }
    }

    /// Open a session for an email already verified by `provider`.
    pub async fn external(&self, provider: &str, email: &str) -> Result<Session> {
        let session = self.identity.sign_in_external(provider, email).await?;
        info!(
            subsystem = "api",
            component = "auth",
            provider,
            user_id = %session.caller.id,
            "Signed in with external provider"
        );
        Ok(session)
    }
}
