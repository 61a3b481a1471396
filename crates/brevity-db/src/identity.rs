//! PostgreSQL identity provider: accounts and sessions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use brevity_core::{
    new_v7, normalize_email, Caller, Credentials, Error, IdentityProvider, Result, Session,
};

use crate::secrets::{
    generate_session_token, DecoyHash, hash_password_blocking, hash_session_token, verify_password_blocking,
    PasswordParams,
};

/// Default session lifetime in hours (7 days).
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 168;

/// PostgreSQL implementation of IdentityProvider.
#[derive(Clone)]
pub struct PgIdentityProvider {
    pool: Pool<Postgres>,
    session_ttl: Duration,
    password_params: PasswordParams,
    decoy: Arc<DecoyHash>,
}

impl PgIdentityProvider {
    pub fn new(pool: Pool<Postgres>) -> Self {
        let password_params = PasswordParams::default();
        Self {
            pool,
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            password_params,
            decoy: Arc::new(DecoyHash::new(password_params)),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_password_params(mut self, params: PasswordParams) -> Self {
        self.password_params = params;
        self.decoy = Arc::new(DecoyHash::new(params));
        self
    }

    /// Store a new session for `caller` and return it with the plain token.
    ///
    /// The caller's own expired sessions are dropped in the same transaction.
    async fn open_session(&self, caller: Caller) -> Result<Session> {
        let token = generate_session_token();
        let expires_at_utc: DateTime<Utc> = Utc::now() + self.session_ttl;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let pruned = sqlx::query(
            "DELETE FROM user_session WHERE user_id = $1 AND expires_at_utc <= now()",
        )
        .bind(caller.id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?
        .rows_affected();

        sqlx::query(
            "INSERT INTO user_session (token_hash, user_id, created_at_utc, expires_at_utc)
             VALUES ($1, $2, now(), $3)",
        )
        .bind(hash_session_token(&token))
        .bind(caller.id)
        .bind(expires_at_utc)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "identity",
            component = "sessions",
            op = "open",
            owner_id = %caller.id,
            pruned,
            "Opened session"
        );

        Ok(Session {
            token,
            caller,
            expires_at_utc,
        })
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(Uuid, String, Option<String>)>> {
        let row = sqlx::query("SELECT id, email, password_hash FROM app_user WHERE lower(email) = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(|r| (r.get("id"), r.get("email"), r.get("password_hash"))))
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn current_caller(&self, token: &str) -> Result<Caller> {
        let row = sqlx::query(
            "SELECT u.id, u.email
             FROM user_session s
             JOIN app_user u ON u.id = s.user_id
             WHERE s.token_hash = $1 AND s.expires_at_utc > now()",
        )
        .bind(hash_session_token(token))
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(Error::not_authenticated)?;

        Ok(Caller {
            id: row.get("id"),
            email: row.get("email"),
        })
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let email = credentials.normalized_email();
        // Accounts created through OAuth have no password.
        let Some((id, email, Some(hash))) = self.find_user_by_email(&email).await? else {
            self.decoy.verify(credentials.password.clone()).await?;
            return Err(Error::invalid_credentials());
        };

        if !verify_password_blocking(credentials.password.clone(), hash).await? {
            return Err(Error::invalid_credentials());
        }

        self.open_session(Caller { id, email }).await
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Session> {
        let email = credentials.normalized_email();
        let hash =
            hash_password_blocking(credentials.password.clone(), self.password_params).await?;

        let row = sqlx::query(
            "INSERT INTO app_user (id, email, password_hash, created_at_utc)
             VALUES ($1, $2, $3, now())
             ON CONFLICT DO NOTHING
             RETURNING id, email",
        )
        .bind(new_v7())
        .bind(&email)
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(Error::duplicate_email)?;

        let caller = Caller {
            id: row.get("id"),
            email: row.get("email"),
        };
        info!(
            subsystem = "identity",
            component = "accounts",
            op = "sign_up",
            owner_id = %caller.id,
            "Registered account"
        );
        self.open_session(caller).await
    }

    async fn sign_out(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM user_session WHERE token_hash = $1")
            .bind(hash_session_token(token))
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn sign_in_external(&self, provider: &str, email: &str) -> Result<Session> {
        let email = normalize_email(email);

        // Insert-or-fetch; the no-op update makes RETURNING yield the existing row.
        let row = sqlx::query(
            "INSERT INTO app_user (id, email, password_hash, created_at_utc)
             VALUES ($1, $2, NULL, now())
             ON CONFLICT ((lower(email))) DO UPDATE SET email = app_user.email
             RETURNING id, email",
        )
        .bind(new_v7())
        .bind(&email)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let caller = Caller {
            id: row.get("id"),
            email: row.get("email"),
        };
        info!(
            subsystem = "identity",
            component = "accounts",
            op = "sign_in_external",
            provider,
            owner_id = %caller.id,
            "External sign-in"
        );
        self.open_session(caller).await
    }

    async fn purge_expired_sessions(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM user_session WHERE expires_at_utc <= now()")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}
